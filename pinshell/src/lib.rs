//! pinshell: a TLS remote shell channel with certificate fingerprint pinning.
//!
//! Two roles share one transport:
//!
//! - **reverse** ([`session::Initiator`]): dial out, skip CA validation and
//!   accept the peer only if one certificate in its chain hashes to the pinned
//!   SHA-256 fingerprint, then bridge a local interpreter.
//! - **bind** ([`session::Responder`]): generate a throwaway P-521 identity,
//!   listen, and bridge an interpreter for every connection.
//!
//! [`dispatch::run`] selects the role from a [`config::Config`].

pub mod config;
pub mod dispatch;
pub mod error;
pub mod session;
pub mod shell;
pub mod tls;

pub use config::{Cli, Config, Role};
pub use dispatch::{run, Outcome};
pub use error::{ExitKind, ShellError};
pub use session::{Initiator, Responder, Session, SessionStats};
pub use shell::{pump, ShellSpec};
