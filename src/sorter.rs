use crate::error::MotifError;
use crate::pareto::{pareto_ranks, Objectives, Sign};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How many disjoint regions a group's windows form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StructuralLabel {
    /// Single-motif groups; always tier 0
    SingleRegion,
    Regions(usize),
}

impl StructuralLabel {
    pub fn tier(&self) -> usize {
        match self {
            StructuralLabel::SingleRegion => 0,
            StructuralLabel::Regions(k) => *k,
        }
    }
}

impl fmt::Display for StructuralLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuralLabel::SingleRegion => f.write_str("single-region"),
            StructuralLabel::Regions(k) => write!(f, "{k}"),
        }
    }
}

impl FromStr for StructuralLabel {
    type Err = MotifError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "single-region" {
            return Ok(StructuralLabel::SingleRegion);
        }
        s.parse::<usize>()
            .ok()
            .filter(|&k| k > 0)
            .map(StructuralLabel::Regions)
            .ok_or_else(|| MotifError::InvalidTier(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    /// Rank by Pareto layers inside each (sign, tier) partition; with
    /// `split_sign` off, positive and negative groups share one ranking
    Pareto {
        max_rank: Option<usize>,
        split_sign: bool,
    },
    /// Skip ranking and order by (sign, tier, magnitude)
    Simple,
}

impl Default for SortMode {
    fn default() -> Self {
        SortMode::Pareto {
            max_rank: None,
            split_sign: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SortEntry<K> {
    pub key: K,
    pub median: f64,
    pub count: usize,
    pub label: StructuralLabel,
}

/// Position of a group in the display order
#[derive(Debug, Clone, PartialEq)]
pub struct Placement<K> {
    pub key: K,
    pub sign: Sign,
    pub tier: usize,
    pub rank: Option<usize>,
    pub median: f64,
}

/// Positive groups: larger |median| first. Negative groups: smaller |median|
/// first, so the mildest negative effect leads its rank.
fn magnitude_order(sign: Sign, a: f64, b: f64) -> Ordering {
    match sign {
        Sign::Positive => b.abs().total_cmp(&a.abs()),
        Sign::Negative => a.abs().total_cmp(&b.abs()),
    }
}

/// Total display order: sign, structural tier, Pareto rank, then magnitude,
/// with the key as the final tie-break. Groups ranked beyond `max_rank` are
/// left out.
pub fn hierarchical_order<K: Ord + Clone>(entries: &[SortEntry<K>], mode: SortMode) -> Vec<Placement<K>> {
    let mut placements: Vec<Placement<K>> = entries
        .iter()
        .map(|e| Placement {
            key: e.key.clone(),
            sign: Sign::of(e.median),
            tier: e.label.tier(),
            rank: None,
            median: e.median,
        })
        .collect();

    if let SortMode::Pareto {
        max_rank,
        split_sign,
    } = mode
    {
        let mut partitions: BTreeMap<(Option<Sign>, usize), Vec<usize>> = BTreeMap::new();
        for (idx, p) in placements.iter().enumerate() {
            let sign = split_sign.then_some(p.sign);
            partitions.entry((sign, p.tier)).or_default().push(idx);
        }

        for members in partitions.values() {
            let points: Vec<Objectives> = members
                .iter()
                .map(|&i| Objectives::new(entries[i].median, entries[i].count))
                .collect();
            for (&i, rank) in members.iter().zip(pareto_ranks(&points, max_rank)) {
                placements[i].rank = rank;
            }
        }
        placements.retain(|p| p.rank.is_some());
    }

    placements.sort_by(|a, b| {
        a.sign
            .cmp(&b.sign)
            .then(a.tier.cmp(&b.tier))
            .then(a.rank.cmp(&b.rank))
            .then_with(|| magnitude_order(a.sign, a.median, b.median))
            .then_with(|| a.key.cmp(&b.key))
    });
    placements
}
