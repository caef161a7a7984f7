use clap::Parser;
use tracing_subscriber::EnvFilter;

use cdevents_cli::commands::{self, Cli};
use cdevents_cli::config::CliConfig;

fn main() -> anyhow::Result<()> {
    // Initialize logging on stderr; stdout carries command output
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load config
    let config = CliConfig::load()?;
    tracing::debug!(source = %config.source(), pretty = config.pretty(), "config loaded");

    let output = commands::run(cli, &config, std::io::stdin().lock())?;
    println!("{}", output.text);

    if !output.success {
        std::process::exit(1);
    }
    Ok(())
}
