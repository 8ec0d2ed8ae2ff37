use clap::Parser;
use log::{info, warn};
use motifrank::event::InputBundle;
use motifrank::grouping::Criterion;
use motifrank::output::{MatrixSink, TsvSink};
use motifrank::pipeline::{aggregate, AggregationConfig, RunSpec};
use motifrank::sorter::SortMode;
use rayon::ThreadPoolBuilder;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::num::NonZeroUsize;

/// Common options shared between all commands
#[derive(Parser, Debug)]
struct CommonOpts {
    /// Path to the JSON input bundle (alphabet, sequences, optional reference, events).
    #[clap(short = 'i', long, value_parser)]
    input: String,

    /// Number of threads for parallel processing.
    #[clap(short = 't', long, value_parser, default_value_t = NonZeroUsize::new(4).unwrap())]
    num_threads: NonZeroUsize,

    /// Verbosity level (0 = error, 1 = info, 2 = debug)
    #[clap(short, long, default_value = "0")]
    verbose: u8,
}

/// Rank, align and merge motif contribution windows.
#[derive(Parser, Debug)]
#[command(author, version, about, disable_help_subcommand = true)]
enum Args {
    /// Group events and print the ordered group summaries
    Aggregate {
        #[clap(flatten)]
        common: CommonOpts,

        /// Grouping criterion: identity, position, distance, identity-distance or complete
        #[clap(short = 'c', long, value_parser, default_value = "identity")]
        criterion: Criterion,

        /// Motif sizes to aggregate; groups of all sizes share one display order
        #[clap(short = 'n', long, value_delimiter = ',', default_value = "1")]
        motif_sizes: Vec<usize>,

        /// Window length of one motif occurrence
        #[clap(short = 'w', long, value_parser, default_value_t = 10)]
        window_len: usize,

        /// Pseudocount added to every cell before normalization
        #[clap(long, value_parser, default_value_t = motifrank::accumulate::DEFAULT_PSEUDOCOUNT)]
        pseudocount: f64,

        /// Search radius for reference realignment
        #[clap(short = 'r', long, value_parser, default_value_t = motifrank::align::DEFAULT_SEARCH_RADIUS)]
        radius: usize,

        /// Keep recorded positions even when a reference is present
        #[clap(long, action)]
        no_align: bool,

        /// Keep only groups up to this Pareto rank
        #[clap(short = 'm', long, value_parser)]
        max_rank: Option<usize>,

        /// Rank positive and negative groups together
        #[clap(long, action)]
        no_sign_split: bool,

        /// Order by sign, tier and magnitude without Pareto ranks
        #[clap(long, action)]
        simple_sort: bool,

        /// Write normalized frequency matrices to this file
        #[clap(long, value_parser)]
        matrices: Option<String>,

        /// Omit the header line
        #[clap(long, action)]
        no_header: bool,
    },
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    match args {
        Args::Aggregate {
            common,
            criterion,
            motif_sizes,
            window_len,
            pseudocount,
            radius,
            no_align,
            max_rank,
            no_sign_split,
            simple_sort,
            matrices,
            no_header,
        } => {
            initialize(&common)?;

            let sort_mode = if simple_sort {
                SortMode::Simple
            } else {
                SortMode::Pareto {
                    max_rank,
                    split_sign: !no_sign_split,
                }
            };
            let config = AggregationConfig {
                window_len,
                pseudocount,
                search_radius: radius,
                align: !no_align,
                sort_mode,
            };
            let runs: Vec<RunSpec> = motif_sizes
                .iter()
                .map(|&motif_size| RunSpec {
                    criterion,
                    motif_size,
                })
                .collect();

            let bundle = InputBundle::load(&common.input)?;
            let alphabet = bundle.alphabet;
            let tensor = bundle.tensor()?;
            let reference = bundle.reference();
            if reference.is_none() && config.align {
                info!("No reference sequence in bundle; windows keep their recorded positions");
            }
            let table = bundle.into_table()?;
            info!(
                "Loaded {} events over {} sequences of length {}",
                table.len(),
                tensor.sequences(),
                tensor.length()
            );

            let result = aggregate(&tensor, reference.as_ref(), &table, &runs, config)?;
            if !result.skipped().is_empty() {
                warn!("{} groups skipped", result.skipped().len());
            }

            let stdout = io::stdout();
            let mut summary_sink = TsvSink::new(BufWriter::new(stdout.lock()), !no_header)?;
            let mut failed = result.emit(&mut summary_sink);
            summary_sink.into_inner().flush()?;

            if let Some(path) = matrices {
                let file = File::create(&path)?;
                let mut matrix_sink = MatrixSink::new(BufWriter::new(file), alphabet);
                failed.extend(result.emit(&mut matrix_sink));
                matrix_sink.into_inner().flush()?;
                info!("Wrote frequency matrices to {}", path);
            }

            if !failed.is_empty() {
                warn!("{} groups failed to render", failed.len());
            }
        }
    }

    Ok(())
}

/// Initialize logger and thread pool based on common options
fn initialize(common: &CommonOpts) -> io::Result<()> {
    // Initialize logger based on verbosity
    env_logger::Builder::new()
        .filter_level(match common.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    // Configure thread pool
    ThreadPoolBuilder::new()
        .num_threads(common.num_threads.into())
        .build_global()
        .map_err(|e| io::Error::other(format!("Failed to build thread pool: {e}")))
}
