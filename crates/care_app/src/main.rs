use std::process::ExitCode;

use care_app::app::{run, AppConfig};
use care_app::cli::Cli;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().unwrap_or_default();
    if let Err(err) = run(config, cli) {
        eprintln!("haritpal: {err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
