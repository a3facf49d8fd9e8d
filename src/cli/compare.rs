use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::info;

use crate::cli::{output_format, AlignmentFormatArg, OutputFormat};
use crate::consistency::{compare_alignments, ComparisonResult};
use crate::core::alignment::Alignment;
use crate::formats;
use crate::trimming::{Cleaner, Strategy};
use crate::utils::output::write_all_or_nothing;
use crate::utils::validation::{parse_fraction, validate_output_path};

#[derive(Args)]
pub struct CompareArgs {
    /// Alternative alignments of the same sequences
    #[arg(required = true, num_args = 2..)]
    pub inputs: Vec<PathBuf>,

    /// Write the most consistent alignment here
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Alignment format of the output (default: from the output or input extension)
    #[arg(long, value_enum)]
    pub out_format: Option<AlignmentFormatArg>,

    /// Trim the selected alignment: maximum gap fraction of a kept column
    #[arg(long, value_parser = parse_fraction, requires = "output")]
    pub gap_threshold: Option<f64>,

    /// Trim the selected alignment: minimum conservation of a kept column
    #[arg(long, value_parser = parse_fraction, requires = "output")]
    pub conservation_threshold: Option<f64>,

    /// Trim the selected alignment: minimum consistency of a kept column
    #[arg(long, value_parser = parse_fraction, requires = "output")]
    pub consistency_threshold: Option<f64>,
}

impl CompareArgs {
    fn trims(&self) -> bool {
        self.gap_threshold.is_some()
            || self.conservation_threshold.is_some()
            || self.consistency_threshold.is_some()
    }

    fn strategy(&self) -> Strategy {
        let strategy = Strategy::manual(self.gap_threshold, self.conservation_threshold);
        match self.consistency_threshold {
            Some(threshold) => strategy.with_consistency_threshold(threshold),
            None => strategy,
        }
    }
}

pub fn run(args: &CompareArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let alignments = args
        .inputs
        .iter()
        .map(|path| {
            formats::read_alignment(path, None)
                .with_context(|| format!("Failed to read alignment {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<Alignment>>>()?;

    if verbose {
        for (path, alignment) in args.inputs.iter().zip(&alignments) {
            eprintln!(
                "{}: {} sequences x {} columns",
                path.display(),
                alignment.num_sequences(),
                alignment.num_columns()
            );
        }
    }

    let result = compare_alignments(&alignments)?;
    let best_path = &args.inputs[result.best];
    info!("Most consistent alignment: {}", best_path.display());

    let mut kept_columns = None;
    if let Some(path) = &args.output {
        let inputs: Vec<&Path> = args.inputs.iter().map(PathBuf::as_path).collect();
        validate_output_path(path, &inputs)?;

        let best = &alignments[result.best];
        let winner = if args.trims() {
            let strategy = args.strategy();
            strategy.validate()?;
            let outcome = Cleaner::new(best, strategy)
                .with_column_consistency(result.column_consistency[result.best].clone())
                .run()?;
            info!(
                "Kept {} of {} columns of the selected alignment",
                outcome.report.kept_columns(),
                best.num_columns()
            );
            kept_columns = Some(outcome.report.kept_columns());
            outcome.alignment
        } else {
            best.clone()
        };

        let out_format = output_format(args.out_format, Some(path.as_path()), best_path);
        let rendered = formats::render_alignment(&winner, out_format)?;
        write_all_or_nothing(&[(path.as_path(), rendered.as_slice())])
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    match format {
        OutputFormat::Text => print_text_comparison(args, &result, kept_columns),
        OutputFormat::Json => print_json_comparison(args, &result, kept_columns)?,
        OutputFormat::Tsv => print_tsv_comparison(args, &result),
    }

    Ok(())
}

fn print_text_comparison(args: &CompareArgs, result: &ComparisonResult, kept_columns: Option<usize>) {
    println!("Consistency Results");
    println!("{}", "=".repeat(60));

    for (i, (path, score)) in args.inputs.iter().zip(&result.scores).enumerate() {
        let marker = if i == result.best { " (selected)" } else { "" };
        println!("  {}: {:.4}{}", path.display(), score, marker);
    }
    if let Some(kept) = kept_columns {
        println!(
            "\nTrimmed selection keeps {} of {} columns",
            kept,
            result.column_consistency[result.best].len()
        );
    }
}

fn print_json_comparison(
    args: &CompareArgs,
    result: &ComparisonResult,
    kept_columns: Option<usize>,
) -> anyhow::Result<()> {
    let alignments: Vec<_> = args
        .inputs
        .iter()
        .zip(&result.scores)
        .zip(&result.column_consistency)
        .map(|((path, score), columns)| {
            serde_json::json!({
                "path": path.display().to_string(),
                "score": score,
                "column_consistency": columns,
            })
        })
        .collect();

    let output = serde_json::json!({
        "selected": args.inputs[result.best].display().to_string(),
        "selected_index": result.best,
        "best_score": result.best_score(),
        "trimmed_kept_columns": kept_columns,
        "alignments": alignments,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_comparison(args: &CompareArgs, result: &ComparisonResult) {
    println!("path\tcolumns\tscore\tselected");
    for (i, (path, score)) in args.inputs.iter().zip(&result.scores).enumerate() {
        println!(
            "{}\t{}\t{:.4}\t{}",
            path.display(),
            result.column_consistency[i].len(),
            score,
            i == result.best
        );
    }
}
