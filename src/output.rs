use crate::error::Result;
use crate::onehot::Alphabet;
use crate::pipeline::{MetadataRecord, RecordSink};
use std::io::Write;

pub const SUMMARY_HEADER: &str =
    "index\tcriterion\tmotif.size\tgroup\tregions\trank\tcount\tmedian\tmean\tstarts\thighlights";

/// Shortest decimal form with at most 7 fractional digits
pub fn format_value(value: f64) -> String {
    let formatted = format!("{:.7}", value);
    let trimmed = formatted.trim_end_matches('0');
    if trimmed.ends_with('.') {
        trimmed.trim_end_matches('.').to_string()
    } else {
        trimmed.to_string()
    }
}

fn join<I: IntoIterator<Item = String>>(items: I, sep: &str) -> String {
    items.into_iter().collect::<Vec<_>>().join(sep)
}

/// One summary row per group
pub struct TsvSink<W: Write> {
    writer: W,
}

impl<W: Write> TsvSink<W> {
    pub fn new(mut writer: W, include_header: bool) -> Result<Self> {
        if include_header {
            writeln!(writer, "{SUMMARY_HEADER}")?;
        }
        Ok(Self { writer })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for TsvSink<W> {
    fn render(&mut self, record: &MetadataRecord<'_>) -> Result<()> {
        let summary = record.summary;
        let starts = join(summary.regions.iter().map(|r| r.start.to_string()), ",");
        let highlights = join(
            summary.regions.iter().map(|r| {
                join(
                    r.highlights.iter().map(|(s, e)| format!("{s}-{e}")),
                    "+",
                )
            }),
            ",",
        );
        let rank = record
            .rank
            .map_or_else(|| ".".to_string(), |r| r.to_string());

        writeln!(
            self.writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            record.display_index,
            summary.run.criterion,
            summary.run.motif_size,
            summary.id.key,
            summary.label,
            rank,
            summary.count,
            format_value(summary.median),
            format_value(summary.mean),
            starts,
            highlights
        )?;
        Ok(())
    }
}

/// Normalized frequency matrices, one block per region:
/// a `>index\tgroup\tstart` line followed by one row per symbol
pub struct MatrixSink<W: Write> {
    writer: W,
    alphabet: Alphabet,
}

impl<W: Write> MatrixSink<W> {
    pub fn new(writer: W, alphabet: Alphabet) -> Self {
        Self { writer, alphabet }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for MatrixSink<W> {
    fn render(&mut self, record: &MetadataRecord<'_>) -> Result<()> {
        let symbols = self.alphabet.symbols();
        for region in &record.summary.regions {
            writeln!(
                self.writer,
                ">{}\t{}\t{}",
                record.display_index, record.summary.id.key, region.start
            )?;
            for (row, &symbol) in symbols.iter().enumerate() {
                let cells = join(
                    region.frequencies.row(row).iter().map(|&v| format_value(v)),
                    "\t",
                );
                writeln!(self.writer, "{}\t{}", symbol as char, cells)?;
            }
        }
        Ok(())
    }
}
