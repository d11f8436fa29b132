//! Role dispatch: turn a resolved [`Config`] into one run of the process.

use pinshell_auth::Fingerprint;

use crate::config::{Config, Role};
use crate::error::ShellError;
use crate::session::{Initiator, Responder};
use crate::shell::{self, ShellSpec};

/// How a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Configuration was incomplete, so nothing was attempted.
    Idle,
    /// An initiator session was established and its interpreter has finished.
    Completed,
}

/// Run the configured role.
///
/// The pinned fingerprint is decoded before either role starts, so a bad value
/// fails fast even in bind mode where it is otherwise unused. A responder never
/// returns `Ok`.
pub async fn run(config: &Config, shell: &ShellSpec) -> Result<Outcome, ShellError> {
    if !config.is_configured() {
        tracing::debug!("Incomplete configuration, nothing to do");
        return Ok(Outcome::Idle);
    }

    let pinned = Fingerprint::parse_hex(&config.fingerprint)?;

    match config.role() {
        Role::Initiator => reverse(&config.target, &pinned, shell).await,
        Role::Responder => bind(&config.target, shell.clone()).await,
    }
}

async fn reverse(
    target: &str,
    pinned: &Fingerprint,
    shell: &ShellSpec,
) -> Result<Outcome, ShellError> {
    let session = Initiator::new()?.dial(target, pinned).await?;
    tracing::debug!(peer = ?session.peer_addr(), "Session established");

    let status = shell::pump(session, shell).await?;
    tracing::debug!(?status, "Session ended");

    Ok(Outcome::Completed)
}

async fn bind(target: &str, shell: ShellSpec) -> Result<Outcome, ShellError> {
    let responder = Responder::bind(target).await?;
    responder.serve(shell).await;

    Ok(Outcome::Completed)
}
