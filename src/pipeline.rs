use crate::accumulate::{accumulate_group, normalize, ScratchBuffer, DEFAULT_PSEUDOCOUNT};
use crate::align::{best_offset, DEFAULT_SEARCH_RADIUS};
use crate::error::{MotifError, Result};
use crate::event::EventTable;
use crate::grouping::{group_fields, Criterion, Field, GroupKey};
use crate::merge::{merge_windows, Window};
use crate::onehot::{OneHotElement, OneHotTensor, Reference};
use crate::sorter::{hierarchical_order, SortEntry, SortMode, StructuralLabel};
use crate::stats::{mean, median};
use log::{debug, info, warn};
use nalgebra::DMatrix;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Configuration shared by every run of one aggregation
#[derive(Debug, Clone)]
pub struct AggregationConfig {
    pub window_len: usize,
    pub pseudocount: f64,
    pub search_radius: usize,
    /// Realign windows against the reference when one is supplied
    pub align: bool,
    pub sort_mode: SortMode,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            window_len: 10,
            pseudocount: DEFAULT_PSEUDOCOUNT,
            search_radius: DEFAULT_SEARCH_RADIUS,
            align: true,
            sort_mode: SortMode::default(),
        }
    }
}

/// One grouping pass over the events of a single motif size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSpec {
    pub criterion: Criterion,
    pub motif_size: usize,
}

/// Identifies a group across all runs of an aggregation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId {
    pub run: usize,
    pub key: GroupKey,
}

/// A normalized frequency matrix and where it sits in the display frame
#[derive(Debug, Clone)]
pub struct RegionMatrix {
    pub start: usize,
    pub frequencies: DMatrix<f64>,
    /// Inclusive spans of the constituent windows relative to `start`
    pub highlights: Vec<(usize, usize)>,
}

#[derive(Debug, Clone)]
pub struct GroupSummary {
    pub id: GroupId,
    pub run: RunSpec,
    pub label: StructuralLabel,
    pub regions: Vec<RegionMatrix>,
    pub values: Vec<f64>,
    pub median: f64,
    pub mean: f64,
    pub count: usize,
}

/// What the rendering layer receives for each group, in display order
#[derive(Debug, Clone, Copy)]
pub struct MetadataRecord<'a> {
    pub display_index: usize,
    pub rank: Option<usize>,
    pub summary: &'a GroupSummary,
    pub config: &'a AggregationConfig,
}

/// Consumer of ordered records; failures are isolated per group
pub trait RecordSink {
    fn render(&mut self, record: &MetadataRecord<'_>) -> Result<()>;
}

/// A group that could not be summarized or rendered, or an event that could
/// not be keyed
#[derive(Debug)]
pub struct SkippedGroup {
    pub group: String,
    pub error: MotifError,
}

#[derive(Debug)]
pub struct Aggregation {
    config: AggregationConfig,
    summaries: Vec<GroupSummary>,
    /// (index into summaries, rank) in display order
    order: Vec<(usize, Option<usize>)>,
    skipped: Vec<SkippedGroup>,
}

impl Aggregation {
    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    pub fn summaries(&self) -> &[GroupSummary] {
        &self.summaries
    }

    pub fn skipped(&self) -> &[SkippedGroup] {
        &self.skipped
    }

    /// Records in display order, indexed from 1
    pub fn records(&self) -> impl Iterator<Item = MetadataRecord<'_>> + '_ {
        self.order
            .iter()
            .enumerate()
            .map(move |(idx, &(summary_idx, rank))| MetadataRecord {
                display_index: idx + 1,
                rank,
                summary: &self.summaries[summary_idx],
                config: &self.config,
            })
    }

    /// Display order as group ids
    pub fn ordered_ids(&self) -> Vec<&GroupId> {
        self.records().map(|r| &r.summary.id).collect()
    }

    /// Hand every record to `sink`, continuing past failed groups
    pub fn emit<S: RecordSink>(&self, sink: &mut S) -> Vec<SkippedGroup> {
        let mut failed = Vec::new();
        for record in self.records() {
            if let Err(error) = sink.render(&record) {
                let group = record.summary.id.key.to_string();
                warn!("Failed to render group {}: {}", group, error);
                failed.push(SkippedGroup { group, error });
            }
        }
        failed
    }
}

/// Group, accumulate, align, merge, summarize and order the events of every run
pub fn aggregate<T: OneHotElement>(
    tensor: &OneHotTensor<T>,
    reference: Option<&Reference>,
    table: &EventTable,
    runs: &[RunSpec],
    config: AggregationConfig,
) -> Result<Aggregation> {
    if config.window_len == 0 {
        return Err(MotifError::InvalidInput("window length must be positive".to_string()));
    }

    let mut summaries = Vec::new();
    let mut skipped = Vec::new();

    for (run_idx, run) in runs.iter().enumerate() {
        let fields = group_fields(run.criterion, Some(run.motif_size))?;

        let mut groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
        for event_idx in table.indices_of_size(run.motif_size) {
            match GroupKey::from_event(&fields, &table.events()[event_idx], config.window_len) {
                Ok(key) => groups.entry(key).or_default().push(event_idx),
                Err(error) => {
                    warn!("Skipping event {}: {}", event_idx, error);
                    skipped.push(SkippedGroup {
                        group: format!("event {event_idx}"),
                        error,
                    });
                }
            }
        }
        info!(
            "Run {} ({}, size {}): {} groups",
            run_idx + 1,
            run.criterion,
            run.motif_size,
            groups.len()
        );

        let groups: Vec<(GroupKey, Vec<usize>)> = groups.into_iter().collect();
        let results: Vec<(GroupId, Result<GroupSummary>)> = groups
            .into_par_iter()
            .map_init(ScratchBuffer::new, |scratch, (key, members)| {
                let id = GroupId { run: run_idx, key };
                let summary = summarize_group(
                    tensor, reference, table, *run, &id, &members, &config, scratch,
                );
                (id, summary)
            })
            .collect();

        for (id, result) in results {
            record_outcome(&id, result, &mut summaries, &mut skipped);
        }
    }

    let entries: Vec<SortEntry<GroupId>> = summaries
        .iter()
        .map(|s| SortEntry {
            key: s.id.clone(),
            median: s.median,
            count: s.count,
            label: s.label,
        })
        .collect();
    let position: FxHashMap<&GroupId, usize> = summaries
        .iter()
        .enumerate()
        .map(|(idx, s)| (&s.id, idx))
        .collect();
    let order: Vec<(usize, Option<usize>)> = hierarchical_order(&entries, config.sort_mode)
        .into_iter()
        .map(|p| (position[&p.key], p.rank))
        .collect();

    info!(
        "Ordered {} of {} groups ({} skipped)",
        order.len(),
        summaries.len(),
        skipped.len()
    );

    Ok(Aggregation {
        config,
        summaries,
        order,
        skipped,
    })
}

/// Keep a summary, or note why its group was dropped; empty groups vanish
fn record_outcome(
    id: &GroupId,
    result: Result<GroupSummary>,
    summaries: &mut Vec<GroupSummary>,
    skipped: &mut Vec<SkippedGroup>,
) {
    match result {
        Ok(summary) => summaries.push(summary),
        Err(MotifError::EmptyGroup(group)) => {
            debug!("Skipping empty group {}", group);
        }
        Err(error) => {
            warn!("Skipping group {}: {}", id.key, error);
            skipped.push(SkippedGroup {
                group: id.key.to_string(),
                error,
            });
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn summarize_group<T: OneHotElement>(
    tensor: &OneHotTensor<T>,
    reference: Option<&Reference>,
    table: &EventTable,
    run: RunSpec,
    id: &GroupId,
    members: &[usize],
    config: &AggregationConfig,
    scratch: &mut ScratchBuffer,
) -> Result<GroupSummary> {
    if members.is_empty() {
        return Err(MotifError::EmptyGroup(id.key.to_string()));
    }
    let events = table.events();
    let n = run.motif_size;
    for &e in members {
        events[e].check_distances(config.window_len)?;
    }

    let counts = (0..n)
        .map(|i| {
            let windows = members
                .iter()
                .map(|&e| (events[e].sequence, events[e].positions[i]));
            accumulate_group(tensor, windows, config.window_len, scratch)
        })
        .collect::<Result<Vec<_>>>()?;

    let starts = if run.criterion.fixes_positions() {
        absolute_starts(&id.key, &counts, reference, config)?
    } else {
        relative_starts(&id.key, table, members, n, config.window_len)?
    };

    let windows: Vec<Window> = counts
        .into_iter()
        .zip(starts)
        .map(|(matrix, start)| Window::new(matrix, start))
        .collect();
    let regions: Vec<RegionMatrix> = merge_windows(windows)
        .into_iter()
        .map(|merged| RegionMatrix {
            start: merged.window.start,
            frequencies: normalize(&merged.window.matrix, config.pseudocount),
            highlights: merged.highlights,
        })
        .collect();

    let label = if n == 1 {
        StructuralLabel::SingleRegion
    } else {
        StructuralLabel::Regions(regions.len())
    };

    let values: Vec<f64> = members.iter().map(|&e| events[e].value).collect();
    debug!(
        "Group {}: {} events, {} region(s)",
        id.key,
        values.len(),
        regions.len()
    );

    Ok(GroupSummary {
        id: id.clone(),
        run,
        label,
        regions,
        median: median(&values),
        mean: mean(&values),
        count: values.len(),
        values,
    })
}

/// Window starts taken from the key's positions, realigned to the reference
fn absolute_starts(
    key: &GroupKey,
    counts: &[DMatrix<f64>],
    reference: Option<&Reference>,
    config: &AggregationConfig,
) -> Result<Vec<usize>> {
    counts
        .iter()
        .enumerate()
        .map(|(i, matrix)| {
            let position = key.get(Field::Position(i + 1)).ok_or_else(|| {
                MotifError::InvalidInput(format!("group {key} has no position {}", i + 1))
            })? as usize;
            Ok(match reference {
                Some(reference) if config.align => {
                    best_offset(matrix, reference, position, config.search_radius).start
                }
                _ => position,
            })
        })
        .collect()
}

/// Starts laid out from zero using the key's distances, or the median
/// distance over the group when the key has none
fn relative_starts(
    key: &GroupKey,
    table: &EventTable,
    members: &[usize],
    n: usize,
    window_len: usize,
) -> Result<Vec<usize>> {
    let overflow = || MotifError::InvalidInput(format!("layout of group {key} overflows"));
    let width = i64::try_from(window_len).map_err(|_| overflow())?;

    let mut starts: Vec<i64> = Vec::with_capacity(n);
    starts.push(0);
    for i in 0..n.saturating_sub(1) {
        let gap = key.get(Field::Distance(i + 1)).unwrap_or_else(|| {
            let gaps: Vec<f64> = members
                .iter()
                .filter_map(|&e| table.events()[e].distance(i, window_len))
                .map(|d| d as f64)
                .collect();
            median(&gaps).round() as i64
        });
        let next = starts[i]
            .checked_add(width)
            .and_then(|s| s.checked_add(gap))
            .ok_or_else(overflow)?;
        starts.push(next);
    }
    let min = starts.iter().copied().min().unwrap_or(0);
    starts
        .into_iter()
        .map(|s| {
            s.checked_sub(min)
                .and_then(|offset| usize::try_from(offset).ok())
                .ok_or_else(overflow)
        })
        .collect()
}
