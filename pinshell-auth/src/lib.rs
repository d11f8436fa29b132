//! Pure certificate pinning library for pinshell.
//!
//! This crate is intentionally IO-free:
//! - No filesystem operations
//! - No network calls
//! - No logging
//!
//! It answers one question: does a presented certificate chain contain the
//! certificate whose SHA-256 digest was pinned out of band?
//!
//! # Example
//!
//! ```
//! use pinshell_auth::{check_key_pin, Fingerprint};
//!
//! let leaf_der: &[u8] = b"...DER bytes observed during the handshake...";
//! let pinned = Fingerprint::of_certificate(leaf_der);
//!
//! assert!(check_key_pin(&[leaf_der], &pinned));
//! ```

pub mod cert;
pub mod identity;
pub mod trust;

pub use cert::{inspect_certificate, CertError, CertInfo};
pub use identity::{Fingerprint, FingerprintError};
pub use trust::{check_key_pin, evaluate_chain, PinDecision};
