//! Tabular ML - Main Entry Point

use clap::Parser;
use tabular_ml::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tabular_ml=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}
