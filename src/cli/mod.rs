//! Command-line interface for msa-trim.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **trim**: Remove poorly aligned columns and redundant sequences
//! - **compare**: Score alternative alignments of one sequence set by consistency
//! - **stats**: Print per-column gap and conservation statistics
//!
//! ## Usage
//!
//! ```text
//! # Automated trimming, alignment written to stdout
//! msa-trim trim input.fa --heuristic automated1 > trimmed.fa
//!
//! # Manual thresholds with a JSON report
//! msa-trim --format json trim input.fa -o trimmed.fa \
//!     --gap-threshold 0.9 --conservation-threshold 0.6 --report report.json
//!
//! # Pick the most consistent of several aligners' outputs
//! msa-trim compare muscle.fa mafft.fa clustal.fa -o best.fa
//! ```

use clap::{Parser, Subcommand};

pub mod compare;
pub mod stats;
pub mod trim;

#[derive(Parser)]
#[command(name = "msa-trim")]
#[command(version)]
#[command(about = "Trim multiple sequence alignments for phylogenetic analysis")]
#[command(
    long_about = "msa-trim removes spurious columns and redundant sequences from multiple sequence alignments.\n\nColumns are selected by gap and conservation thresholds or by automated heuristics (nogaps, noallgaps, gappyout, strict, strictplus, automated1). Sequences can be filtered by maximum identity, clustering or overlap with the well-aligned columns."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format for summaries and reports
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Trim an alignment
    Trim(trim::TrimArgs),

    /// Compare alternative alignments of the same sequences
    Compare(compare::CompareArgs),

    /// Show column and sequence statistics
    Stats(stats::StatsArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Alignment file format on the command line
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum AlignmentFormatArg {
    Fasta,
    Phylip,
}

impl From<AlignmentFormatArg> for crate::formats::AlignmentFormat {
    fn from(arg: AlignmentFormatArg) -> Self {
        match arg {
            AlignmentFormatArg::Fasta => Self::Fasta,
            AlignmentFormatArg::Phylip => Self::Phylip,
        }
    }
}

/// Pick an output format: explicit flag, then output extension, then the input's.
fn output_format(
    explicit: Option<AlignmentFormatArg>,
    output: Option<&std::path::Path>,
    input: &std::path::Path,
) -> crate::formats::AlignmentFormat {
    use crate::formats::AlignmentFormat;

    explicit
        .map(AlignmentFormat::from)
        .or_else(|| output.and_then(AlignmentFormat::from_path))
        .or_else(|| AlignmentFormat::from_path(input))
        .unwrap_or(AlignmentFormat::Fasta)
}

fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}
