//! carestar - Main Entry Point
//!
//! Home healthcare quality star-rating analysis from the command line.

use clap::Parser;
use carestar::cli::{cmd_analyze, cmd_info, cmd_profile, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carestar=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => {
            cmd_analyze(&args)?;
        }
        Commands::Info { data, separator } => {
            cmd_info(&data, separator)?;
        }
        Commands::Profile { data, bins, plots } => {
            cmd_profile(&data, bins, plots.as_deref())?;
        }
    }

    Ok(())
}
