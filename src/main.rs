use clap::Parser;
use tracing_subscriber::EnvFilter;

use msa_trim::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("msa_trim=debug,info")
    } else {
        EnvFilter::new("msa_trim=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        cli::Commands::Trim(args) => {
            cli::trim::run(&args, cli.format, cli.verbose)?;
        }
        cli::Commands::Compare(args) => {
            cli::compare::run(&args, cli.format, cli.verbose)?;
        }
        cli::Commands::Stats(args) => {
            cli::stats::run(&args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
