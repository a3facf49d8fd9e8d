//! Stats command - inspect the statistics trimming decisions are made from.
//!
//! Prints per-column gap fraction and conservation, the pairwise identity
//! summary, and the cutoffs each heuristic would derive for the alignment.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::cli::trim::MeasureArg;
use crate::cli::{format_optional, OutputFormat};
use crate::core::alignment::Alignment;
use crate::formats;
use crate::statistics::{ConservationStatistics, GapStatistics, SequencesMatrix, SimilarityMatrix};
use crate::trimming::heuristics::{self, ColumnProfile, IdentitySummary, Policy};
use crate::trimming::Heuristic;

/// Arguments for the stats command
#[derive(Args)]
pub struct StatsArgs {
    /// Input alignment (FASTA or PHYLIP, optionally gzipped)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Custom similarity matrix file
    #[arg(long)]
    pub matrix: Option<PathBuf>,

    /// Conservation measure
    #[arg(long, value_enum, default_value = "similarity")]
    pub measure: MeasureArg,

    /// Do not count terminal gaps
    #[arg(long)]
    pub ignore_terminal_gaps: bool,

    /// Also print per-column values
    #[arg(long)]
    pub columns: bool,
}

const HEURISTICS: [Heuristic; 6] = [
    Heuristic::NoGaps,
    Heuristic::NoAllGaps,
    Heuristic::GappyOut,
    Heuristic::Strict,
    Heuristic::StrictPlus,
    Heuristic::Automated1,
];

/// Everything the stats command reports
struct AlignmentStats {
    gap_fractions: Vec<f64>,
    conservation: Vec<Option<f64>>,
    identity: IdentitySummary,
    policies: Vec<(Heuristic, Policy)>,
}

impl AlignmentStats {
    fn compute(alignment: &Alignment, matrix: &SimilarityMatrix, args: &StatsArgs) -> Self {
        let gaps = GapStatistics::compute(alignment);
        let conservation = ConservationStatistics::compute(alignment, matrix, args.measure.into());
        let identity = IdentitySummary::from_matrix(&SequencesMatrix::compute(alignment));

        let gap_counts = gaps.counts(args.ignore_terminal_gaps);
        let scores = conservation.scores();
        let profile = ColumnProfile {
            gap_counts: &gap_counts,
            num_sequences: gaps.num_sequences(),
            conservation: &scores,
        };
        let policies = HEURISTICS
            .iter()
            .map(|&h| (h, heuristics::policy(h, &profile, || identity)))
            .collect();

        Self {
            gap_fractions: gaps.fractions(args.ignore_terminal_gaps),
            conservation: conservation.values().to_vec(),
            identity,
            policies,
        }
    }
}

/// Execute the stats command
///
/// # Errors
///
/// Returns an error if the alignment or matrix cannot be read.
pub fn run(args: &StatsArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let alignment = formats::read_alignment(&args.input, None)
        .with_context(|| format!("Failed to read alignment {}", args.input.display()))?;
    let matrix = match &args.matrix {
        Some(path) => SimilarityMatrix::load_from_file(path)
            .with_context(|| format!("Failed to load similarity matrix {}", path.display()))?,
        None => SimilarityMatrix::for_residue_type(alignment.residue_type()),
    };

    if verbose {
        eprintln!("Using similarity matrix {}", matrix.name());
    }

    let stats = AlignmentStats::compute(&alignment, &matrix, args);

    match format {
        OutputFormat::Text => print_text_stats(args, &alignment, &stats),
        OutputFormat::Json => print_json_stats(args, &alignment, &stats)?,
        OutputFormat::Tsv => print_tsv_stats(&stats),
    }

    Ok(())
}

fn print_text_stats(args: &StatsArgs, alignment: &Alignment, stats: &AlignmentStats) {
    println!("Alignment Statistics");
    println!("{}", "=".repeat(60));
    println!("\nInput: {}", args.input.display());
    println!("  Residue type: {}", alignment.residue_type());
    println!("  Sequences: {}", alignment.num_sequences());
    println!("  Columns: {}", alignment.num_columns());
    println!("  Mean identity: {:.4}", stats.identity.mean_identity);
    println!(
        "  Mean closest-neighbour identity: {:.4}",
        stats.identity.mean_max_identity
    );

    println!("\nHeuristic cutoffs:");
    for (heuristic, policy) in &stats.policies {
        let resolved = if *heuristic == policy.heuristic {
            String::new()
        } else {
            format!(" (uses {})", policy.heuristic)
        };
        println!(
            "  {:<12} gaps <= {}  conservation >= {}{}",
            heuristic.name(),
            format_optional(policy.gap_cutoff),
            format_optional(policy.conservation_cutoff),
            resolved
        );
    }

    if args.columns {
        println!("\nColumns:");
        println!("  {:>8}  {:>8}  {:>12}", "Column", "Gaps", "Conservation");
        for (i, (gap, cons)) in stats.gap_fractions.iter().zip(&stats.conservation).enumerate() {
            println!("  {:>8}  {:>8.4}  {:>12}", i + 1, gap, format_optional(*cons));
        }
    }
}

fn print_json_stats(args: &StatsArgs, alignment: &Alignment, stats: &AlignmentStats) -> anyhow::Result<()> {
    let policies: Vec<_> = stats
        .policies
        .iter()
        .map(|(heuristic, policy)| {
            serde_json::json!({
                "heuristic": heuristic,
                "resolved": policy.heuristic,
                "gap_cutoff": policy.gap_cutoff,
                "conservation_cutoff": policy.conservation_cutoff,
            })
        })
        .collect();

    let mut output = serde_json::json!({
        "input": args.input.display().to_string(),
        "residue_type": alignment.residue_type(),
        "sequences": alignment.num_sequences(),
        "columns": alignment.num_columns(),
        "identity": stats.identity,
        "heuristics": policies,
    });
    if args.columns {
        output["gap_fractions"] = serde_json::json!(stats.gap_fractions);
        output["conservation"] = serde_json::json!(stats.conservation);
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_stats(stats: &AlignmentStats) {
    println!("column\tgap_fraction\tconservation");
    for (i, (gap, cons)) in stats.gap_fractions.iter().zip(&stats.conservation).enumerate() {
        println!("{}\t{:.4}\t{}", i + 1, gap, format_optional(*cons));
    }
}
