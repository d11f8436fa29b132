//! pinshell binary.
//!
//! Exit status is 0 on success or when unconfigured, otherwise the distinct
//! code of the failure kind.

use std::process::ExitCode;

use clap::Parser;
use pinshell::{run, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let shell = cli.shell_spec();
    let config = cli.into_config();

    match run(&config, &shell).await {
        Ok(outcome) => {
            tracing::debug!(?outcome, "Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal");
            ExitCode::from(e.kind().code() as u8)
        }
    }
}
