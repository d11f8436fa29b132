//! Process configuration.
//!
//! Values come from flags, then environment variables, then defaults baked in
//! at compile time through `PINSHELL_BUILD_*`. A build with no baked values
//! and no flags is unconfigured and stays idle.

use std::path::PathBuf;

use clap::Parser;

use crate::shell::ShellSpec;

const BUILD_TARGET: &str = match option_env!("PINSHELL_BUILD_TARGET") {
    Some(v) => v,
    None => "",
};

const BUILD_FINGERPRINT: &str = match option_env!("PINSHELL_BUILD_FINGERPRINT") {
    Some(v) => v,
    None => "",
};

const BUILD_MODE: &str = match option_env!("PINSHELL_BUILD_MODE") {
    Some(v) => v,
    None => "",
};

/// pinshell - TLS remote shell with certificate fingerprint pinning
#[derive(Debug, Parser)]
#[command(name = "pinshell", version, about)]
pub struct Cli {
    /// host:port to dial (reverse) or to listen on (bind)
    #[arg(long, env = "PINSHELL_TARGET")]
    target: Option<String>,

    /// Pinned SHA-256 certificate fingerprint, hex with optional colons
    #[arg(long, env = "PINSHELL_FINGERPRINT")]
    fingerprint: Option<String>,

    /// "reverse" or "bind"; anything else behaves as reverse
    #[arg(long, env = "PINSHELL_MODE")]
    mode: Option<String>,

    /// Interpreter to bridge sessions to
    #[arg(long, env = "PINSHELL_SHELL")]
    shell: Option<PathBuf>,

    /// Argument passed to the interpreter (repeatable)
    #[arg(long = "shell-arg", value_name = "ARG", allow_hyphen_values = true)]
    shell_args: Vec<String>,
}

impl Cli {
    /// Interpreter to run per session, the platform default when unset.
    pub fn shell_spec(&self) -> ShellSpec {
        let spec = match &self.shell {
            Some(program) => ShellSpec::new(program.clone()),
            None => ShellSpec::platform_default(),
        };
        self.shell_args.iter().fold(spec, |spec, arg| spec.arg(arg))
    }

    /// Resolve flags and environment against the baked defaults.
    pub fn into_config(self) -> Config {
        Config {
            target: self.target.unwrap_or_else(|| BUILD_TARGET.to_string()),
            fingerprint: self
                .fingerprint
                .unwrap_or_else(|| BUILD_FINGERPRINT.to_string()),
            mode: self.mode.unwrap_or_else(|| BUILD_MODE.to_string()),
        }
    }
}

/// The three resolved values the dispatcher runs on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub target: String,
    pub fingerprint: String,
    pub mode: String,
}

impl Config {
    pub fn new(
        target: impl Into<String>,
        fingerprint: impl Into<String>,
        mode: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            fingerprint: fingerprint.into(),
            mode: mode.into(),
        }
    }

    /// True only when all three values are set.
    pub fn is_configured(&self) -> bool {
        !self.target.is_empty() && !self.fingerprint.is_empty() && !self.mode.is_empty()
    }

    pub fn role(&self) -> Role {
        Role::from_mode(&self.mode)
    }
}

/// Which side of the connection this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Dials out and pins the listener ("reverse").
    Initiator,
    /// Listens and accepts anyone ("bind").
    Responder,
}

impl Role {
    /// Exactly `"bind"` selects the responder; every other string falls back to
    /// the initiator.
    pub fn from_mode(mode: &str) -> Self {
        match mode {
            "bind" => Role::Responder,
            _ => Role::Initiator,
        }
    }
}
