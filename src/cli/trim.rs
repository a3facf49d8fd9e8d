use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::{info, warn};

use crate::cli::{format_optional, output_format, AlignmentFormatArg, OutputFormat};
use crate::core::alignment::Alignment;
use crate::core::report::{RemovalReason, TrimmingReport};
use crate::formats::{self, AlignmentFormat};
use crate::statistics::{ConservationMeasure, SimilarityMatrix};
use crate::trimming::{backtranslate_report, Cleaner, ColumnSelection, Heuristic, SequenceFilter, Strategy};
use crate::utils::output::write_all_or_nothing;
use crate::utils::validation::{parse_fraction, parse_index_list, parse_percentage, validate_output_path};

/// Sorted 0-based indices given as `0,3,5-9`.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexList(pub Vec<usize>);

fn index_list(s: &str) -> Result<IndexList, String> {
    parse_index_list(s).map(IndexList).map_err(|e| e.to_string())
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum HeuristicArg {
    Nogaps,
    Noallgaps,
    Gappyout,
    Strict,
    Strictplus,
    Automated1,
}

impl From<HeuristicArg> for Heuristic {
    fn from(arg: HeuristicArg) -> Self {
        match arg {
            HeuristicArg::Nogaps => Self::NoGaps,
            HeuristicArg::Noallgaps => Self::NoAllGaps,
            HeuristicArg::Gappyout => Self::GappyOut,
            HeuristicArg::Strict => Self::Strict,
            HeuristicArg::Strictplus => Self::StrictPlus,
            HeuristicArg::Automated1 => Self::Automated1,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum MeasureArg {
    Similarity,
    Identity,
}

impl From<MeasureArg> for ConservationMeasure {
    fn from(arg: MeasureArg) -> Self {
        match arg {
            MeasureArg::Similarity => Self::Similarity,
            MeasureArg::Identity => Self::Identity,
        }
    }
}

#[derive(Args)]
pub struct TrimArgs {
    /// Input alignment (FASTA or PHYLIP, optionally gzipped)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Write the trimmed alignment here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Alignment format of the output (default: from the output or input extension)
    #[arg(long, value_enum)]
    pub out_format: Option<AlignmentFormatArg>,

    /// Maximum gap fraction a kept column may have
    #[arg(long, value_parser = parse_fraction, conflicts_with = "heuristic")]
    pub gap_threshold: Option<f64>,

    /// Minimum conservation a kept column must have
    #[arg(long, value_parser = parse_fraction, conflicts_with = "heuristic")]
    pub conservation_threshold: Option<f64>,

    /// Automated column selection
    #[arg(long, value_enum)]
    pub heuristic: Option<HeuristicArg>,

    /// Remove exactly these 0-based columns (e.g. 0,3,5-9)
    #[arg(
        long,
        value_parser = index_list,
        conflicts_with_all = ["heuristic", "gap_threshold", "conservation_threshold", "block", "conserve"]
    )]
    pub remove_columns: Option<IndexList>,

    /// Remove exactly these 0-based sequences
    #[arg(
        long,
        value_parser = index_list,
        conflicts_with_all = ["max_identity", "cluster_identity", "clusters"]
    )]
    pub remove_sequences: Option<IndexList>,

    /// Conservation measure
    #[arg(long, value_enum)]
    pub measure: Option<MeasureArg>,

    /// Custom similarity matrix file
    #[arg(long)]
    pub matrix: Option<PathBuf>,

    /// Half width of the smoothing window over column statistics
    #[arg(long)]
    pub window: Option<usize>,

    /// Only remove columns outside the first and last gap-free column
    #[arg(long)]
    pub terminal_only: bool,

    /// Do not count terminal gaps when scoring columns
    #[arg(long)]
    pub ignore_terminal_gaps: bool,

    /// Minimum length of a kept column block
    #[arg(long)]
    pub block: Option<usize>,

    /// Output the rejected columns instead of the kept ones
    #[arg(long)]
    pub complementary: bool,

    /// Minimum fraction of good columns a sequence must cover
    #[arg(long, value_parser = parse_fraction)]
    pub overlap: Option<f64>,

    /// Iteration cap for overlap filtering
    #[arg(long)]
    pub max_overlap_passes: Option<usize>,

    /// Drop one of every sequence pair above this identity
    #[arg(long, value_parser = parse_fraction, conflicts_with_all = ["cluster_identity", "clusters"])]
    pub max_identity: Option<f64>,

    /// Keep one representative per cluster at this identity
    #[arg(long, value_parser = parse_fraction, conflicts_with = "clusters")]
    pub cluster_identity: Option<f64>,

    /// Keep one representative for each of N clusters
    #[arg(long)]
    pub clusters: Option<usize>,

    /// Percentage of original columns that must be kept
    #[arg(long, value_parser = parse_percentage)]
    pub conserve: Option<f64>,

    /// Keep sequences left with only gaps
    #[arg(long)]
    pub keep_sequences: bool,

    /// Produce an empty alignment instead of failing
    #[arg(long)]
    pub allow_empty: bool,

    /// Strategy JSON file; command-line flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the per-column trimming report here (format follows --format)
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Coding sequences (FASTA) to backtranslate a protein alignment onto
    #[arg(long, requires = "backtrans_out")]
    pub backtrans: Option<PathBuf>,

    /// Output file for the backtranslated codon alignment
    #[arg(long, requires = "backtrans")]
    pub backtrans_out: Option<PathBuf>,
}

pub fn run(args: &TrimArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let strategy = build_strategy(args)?;
    let alignment = formats::read_alignment(&args.input, None)
        .with_context(|| format!("Failed to read alignment {}", args.input.display()))?;

    if verbose {
        eprintln!(
            "Input: {} sequences x {} columns ({})",
            alignment.num_sequences(),
            alignment.num_columns(),
            alignment.residue_type()
        );
    }

    let matrix = match &args.matrix {
        Some(path) => SimilarityMatrix::load_from_file(path)
            .with_context(|| format!("Failed to load similarity matrix {}", path.display()))?,
        None => SimilarityMatrix::for_residue_type(alignment.residue_type()),
    };

    let outcome = Cleaner::with_matrix(&alignment, strategy, matrix).run()?;
    let report = &outcome.report;
    info!(
        "Kept {} of {} columns and {} of {} sequences",
        report.kept_columns(),
        alignment.num_columns(),
        report.kept_sequences(),
        alignment.num_sequences()
    );

    let codons = match &args.backtrans {
        Some(path) => {
            let cds = formats::read_sequences(path)
                .with_context(|| format!("Failed to read coding sequences {}", path.display()))?;
            Some(backtranslate_report(&alignment, report, &cds)?)
        }
        None => None,
    };

    for path in [&args.output, &args.backtrans_out, &args.report].into_iter().flatten() {
        validate_output_path(path, &[args.input.as_path()])?;
    }

    // Render every output before any file is created
    let out_format = output_format(args.out_format, args.output.as_deref(), &args.input);
    let rendered = formats::render_alignment(&outcome.alignment, out_format)?;
    let mut files: Vec<(&Path, Vec<u8>)> = Vec::new();
    if let Some(path) = &args.output {
        files.push((path.as_path(), rendered.clone()));
    }
    if let (Some(codons), Some(path)) = (&codons, &args.backtrans_out) {
        let codon_format = AlignmentFormat::from_path(path).unwrap_or(AlignmentFormat::Fasta);
        files.push((path.as_path(), formats::render_alignment(codons, codon_format)?));
    }
    if let Some(path) = &args.report {
        let mut buffer = Vec::new();
        write_report(report, format, &mut buffer)?;
        files.push((path.as_path(), buffer));
    }

    let staged: Vec<(&Path, &[u8])> = files.iter().map(|(p, b)| (*p, b.as_slice())).collect();
    write_all_or_nothing(&staged).context("Failed to write outputs")?;

    if args.output.is_none() {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(&rendered)?;
        handle.flush()?;
    }

    // Summaries go to stdout only when the alignment did not
    if args.output.is_some() {
        match format {
            OutputFormat::Text => print_text_summary(&args.input, &alignment, &outcome.alignment, report),
            OutputFormat::Json => print_json_summary(&args.input, &alignment, &outcome.alignment, report)?,
            OutputFormat::Tsv => print_tsv_summary(&alignment, &outcome.alignment, report),
        }
    }

    Ok(())
}

/// Strategy from `--config` (or defaults) with command-line flags applied on top.
fn build_strategy(args: &TrimArgs) -> anyhow::Result<Strategy> {
    let mut strategy = match &args.config {
        Some(path) => Strategy::load_from_file(path)
            .with_context(|| format!("Failed to load strategy {}", path.display()))?,
        None => Strategy::default(),
    };

    if let Some(IndexList(columns)) = &args.remove_columns {
        strategy.selection = ColumnSelection::Explicit {
            remove: columns.clone(),
        };
    } else if let Some(heuristic) = args.heuristic {
        strategy.selection = ColumnSelection::Automated {
            heuristic: heuristic.into(),
        };
    } else if args.gap_threshold.is_some() || args.conservation_threshold.is_some() {
        let (gap, conservation) = match strategy.selection {
            ColumnSelection::Manual {
                gap_threshold,
                conservation_threshold,
            } => (gap_threshold, conservation_threshold),
            _ => (None, None),
        };
        strategy.selection = ColumnSelection::Manual {
            gap_threshold: args.gap_threshold.or(gap),
            conservation_threshold: args.conservation_threshold.or(conservation),
        };
    }

    if let Some(measure) = args.measure {
        strategy.measure = measure.into();
    }
    if let Some(window) = args.window {
        strategy.half_window = window;
    }
    if let Some(IndexList(rows)) = &args.remove_sequences {
        strategy.sequence_filter = Some(SequenceFilter::Explicit(rows.clone()));
    } else if let Some(threshold) = args.max_identity {
        strategy.sequence_filter = Some(SequenceFilter::MaxIdentity(threshold));
    } else if let Some(threshold) = args.cluster_identity {
        strategy.sequence_filter = Some(SequenceFilter::ClusterIdentity(threshold));
    } else if let Some(count) = args.clusters {
        strategy.sequence_filter = Some(SequenceFilter::ClusterCount(count));
    }
    if args.overlap.is_some() {
        strategy.overlap_threshold = args.overlap;
    }
    if let Some(passes) = args.max_overlap_passes {
        strategy.max_overlap_passes = passes;
    }
    if args.block.is_some() {
        strategy.block_size = args.block;
    }
    if args.conserve.is_some() {
        strategy.conserve_percentage = args.conserve;
    }
    strategy.terminal_only |= args.terminal_only;
    strategy.ignore_terminal_gaps |= args.ignore_terminal_gaps;
    strategy.complementary |= args.complementary;
    strategy.keep_sequences |= args.keep_sequences;
    strategy.allow_empty |= args.allow_empty;

    if strategy.selection == ColumnSelection::default() && strategy.sequence_filter.is_none() {
        warn!("No thresholds, heuristic or sequence filter given; columns are only removed by tweaks");
    }

    strategy.validate()?;
    Ok(strategy)
}

/// Render a trimming report in the requested format.
///
/// # Errors
///
/// Propagates write and serialization failures.
pub fn write_report<W: Write>(
    report: &TrimmingReport,
    format: OutputFormat,
    writer: &mut W,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, report)?;
            writeln!(writer)?;
        }
        OutputFormat::Tsv => {
            writeln!(writer, "column\tgap_fraction\tconservation\tkept")?;
            for column in &report.columns {
                writeln!(
                    writer,
                    "{}\t{:.4}\t{}\t{}",
                    column.index + 1,
                    column.gap_fraction,
                    format_optional(column.conservation),
                    column.kept
                )?;
            }
        }
        OutputFormat::Text => {
            writeln!(writer, "Trimming Report")?;
            writeln!(writer, "{}", "=".repeat(60))?;
            if let Some(heuristic) = report.heuristic {
                writeln!(writer, "Heuristic: {heuristic}")?;
            }
            writeln!(writer, "Gap cutoff: {}", format_optional(report.gap_cutoff))?;
            writeln!(
                writer,
                "Conservation cutoff: {}",
                format_optional(report.conservation_cutoff)
            )?;
            if let Some(cutoff) = report.consistency_cutoff {
                writeln!(writer, "Consistency cutoff: {cutoff:.4}")?;
            }
            if report.overlap_passes > 0 {
                writeln!(writer, "Overlap passes: {}", report.overlap_passes)?;
            }
            if report.complementary {
                writeln!(writer, "Output: rejected columns (complementary)")?;
            }

            writeln!(writer, "\nColumns:")?;
            writeln!(writer, "  {:>8}  {:>8}  {:>12}  Kept", "Column", "Gaps", "Conservation")?;
            for column in &report.columns {
                writeln!(
                    writer,
                    "  {:>8}  {:>8.4}  {:>12}  {}",
                    column.index + 1,
                    column.gap_fraction,
                    format_optional(column.conservation),
                    if column.kept { "yes" } else { "no" }
                )?;
            }

            let removed: Vec<_> = report.sequences.iter().filter(|s| !s.kept).collect();
            if !removed.is_empty() {
                writeln!(writer, "\nRemoved sequences:")?;
                for seq in removed {
                    writeln!(writer, "  {}: {}", seq.name, describe_reason(seq.reason.as_ref()))?;
                }
            }
        }
    }
    Ok(())
}

fn describe_reason(reason: Option<&RemovalReason>) -> String {
    match reason {
        Some(RemovalReason::MaxIdentity { partner, identity }) => {
            format!("{:.1}% identical to sequence {}", identity * 100.0, partner + 1)
        }
        Some(RemovalReason::Clustered { representative }) => {
            format!("clustered with sequence {}", representative + 1)
        }
        Some(RemovalReason::LowOverlap { overlap }) => {
            format!("covers {:.1}% of good columns", overlap * 100.0)
        }
        Some(RemovalReason::AllGaps) => "only gaps remain".to_string(),
        Some(RemovalReason::Selected) => "selected for removal".to_string(),
        None => "removed".to_string(),
    }
}

fn print_text_summary(input: &Path, original: &Alignment, trimmed: &Alignment, report: &TrimmingReport) {
    println!("Trimming Results");
    println!("{}", "=".repeat(60));
    println!("\nInput: {}", input.display());
    println!("  Residue type: {}", original.residue_type());
    println!(
        "  Sequences: {} kept of {}",
        trimmed.num_sequences(),
        original.num_sequences()
    );
    println!(
        "  Columns: {} kept of {} ({} in output)",
        report.kept_columns(),
        original.num_columns(),
        trimmed.num_columns()
    );
    if let Some(heuristic) = report.heuristic {
        println!("  Heuristic: {heuristic}");
    }
    println!("  Gap cutoff: {}", format_optional(report.gap_cutoff));
    println!(
        "  Conservation cutoff: {}",
        format_optional(report.conservation_cutoff)
    );
}

fn print_json_summary(
    input: &Path,
    original: &Alignment,
    trimmed: &Alignment,
    report: &TrimmingReport,
) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "input": input.display().to_string(),
        "residue_type": original.residue_type(),
        "sequences": {
            "original": original.num_sequences(),
            "kept": trimmed.num_sequences(),
        },
        "columns": {
            "original": original.num_columns(),
            "kept": report.kept_columns(),
            "output": trimmed.num_columns(),
        },
        "heuristic": report.heuristic,
        "gap_cutoff": report.gap_cutoff,
        "conservation_cutoff": report.conservation_cutoff,
        "overlap_passes": report.overlap_passes,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_summary(original: &Alignment, trimmed: &Alignment, report: &TrimmingReport) {
    println!("sequences\tkept_sequences\tcolumns\tkept_columns\theuristic\tgap_cutoff\tconservation_cutoff");
    println!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        original.num_sequences(),
        trimmed.num_sequences(),
        original.num_columns(),
        report.kept_columns(),
        report.heuristic.map_or_else(|| "-".to_string(), |h| h.to_string()),
        format_optional(report.gap_cutoff),
        format_optional(report.conservation_cutoff),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alignment::Sequence;

    fn args(extra: &[&str]) -> TrimArgs {
        use clap::Parser;

        #[derive(clap::Parser)]
        struct Wrapper {
            #[command(flatten)]
            trim: TrimArgs,
        }

        let mut argv = vec!["msa-trim", "input.fa"];
        argv.extend_from_slice(extra);
        Wrapper::parse_from(argv).trim
    }

    #[test]
    fn test_build_strategy_manual() {
        let strategy = build_strategy(&args(&["--gap-threshold", "0.8", "--block", "4"])).unwrap();
        assert_eq!(
            strategy.selection,
            ColumnSelection::Manual {
                gap_threshold: Some(0.8),
                conservation_threshold: None
            }
        );
        assert_eq!(strategy.block_size, Some(4));
    }

    #[test]
    fn test_build_strategy_heuristic_and_filter() {
        let strategy =
            build_strategy(&args(&["--heuristic", "strictplus", "--clusters", "5"])).unwrap();
        assert_eq!(strategy.heuristic(), Some(Heuristic::StrictPlus));
        assert_eq!(strategy.sequence_filter, Some(SequenceFilter::ClusterCount(5)));
    }

    #[test]
    fn test_build_strategy_explicit_removal() {
        let strategy = build_strategy(&args(&[
            "--remove-columns",
            "4-5,0",
            "--remove-sequences",
            "2",
        ]))
        .unwrap();
        assert_eq!(strategy.selection, ColumnSelection::Explicit { remove: vec![0, 4, 5] });
        assert_eq!(strategy.sequence_filter, Some(SequenceFilter::Explicit(vec![2])));
    }

    #[test]
    fn test_index_list_parser() {
        assert_eq!(index_list("1,3-4"), Ok(IndexList(vec![1, 3, 4])));
        assert!(index_list("3-1").unwrap_err().contains("3-1"));
    }

    #[test]
    fn test_build_strategy_rejects_window_with_heuristic() {
        assert!(build_strategy(&args(&["--heuristic", "gappyout", "--window", "2"])).is_err());
    }

    #[test]
    fn test_write_report_tsv() {
        let alignment = Alignment::new(vec![
            Sequence::new("a", "MK-V"),
            Sequence::new("b", "MKLV"),
        ])
        .unwrap();
        let outcome = Cleaner::new(&alignment, Strategy::manual(Some(0.0), None))
            .run()
            .unwrap();

        let mut out = Vec::new();
        write_report(&outcome.report, OutputFormat::Tsv, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "column\tgap_fraction\tconservation\tkept");
        assert!(lines[3].starts_with("3\t0.5000\t"));
        assert!(lines[3].ends_with("\tfalse"));
    }
}
