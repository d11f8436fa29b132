//! Certificate fingerprints.
//!
//! A [`Fingerprint`] is the SHA-256 digest of a DER-encoded certificate. It is
//! written as hexadecimal, optionally in colon-separated byte groups:
//!
//! ```
//! use pinshell_auth::identity::Fingerprint;
//!
//! let a = Fingerprint::parse_hex("AA:BB:CC:DD").unwrap();
//! let b = Fingerprint::parse_hex("aabbccdd").unwrap();
//! assert_eq!(a, b);
//! assert_eq!(a.to_string(), "AA:BB:CC:DD");
//! ```

mod fingerprint;

pub use fingerprint::{Fingerprint, FingerprintError};
