//! Fingerprint type with hex normalization and constant-time equality.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Separator accepted between byte groups of a hex fingerprint.
const SEPARATOR: char = ':';

/// Errors that can occur while decoding a fingerprint string.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum FingerprintError {
    /// The string is not valid hexadecimal once separators are removed.
    #[error("invalid hex fingerprint: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// A certificate content digest.
///
/// Pinned values come from configuration and may be of any length; digests
/// computed from certificates are always 32 bytes. A length mismatch simply
/// never compares equal.
///
/// # Security
///
/// Comparisons use constant-time equality. The bytes themselves are public
/// (they identify a certificate, not a secret).
#[derive(Clone, Eq, Hash)]
#[allow(clippy::derived_hash_with_manual_eq)]
pub struct Fingerprint(Vec<u8>);

impl Fingerprint {
    /// Length of a SHA-256 digest in bytes.
    pub const DIGEST_LEN: usize = 32;

    /// Decode a hexadecimal fingerprint.
    ///
    /// Colons between byte groups and surrounding whitespace are ignored, so
    /// `"AA:BB"` and `"aabb"` decode to the same bytes.
    ///
    /// # Errors
    ///
    /// Returns `FingerprintError::InvalidHex` on odd length or non-hex input.
    pub fn parse_hex(s: &str) -> Result<Self, FingerprintError> {
        let normalized: String = s.trim().chars().filter(|c| *c != SEPARATOR).collect();
        Ok(Self(hex::decode(normalized)?))
    }

    /// Compute the fingerprint of a DER-encoded certificate.
    #[must_use]
    pub fn of_certificate(cert_der: &[u8]) -> Self {
        Self(Sha256::digest(cert_der).to_vec())
    }

    /// Wrap raw digest bytes.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether this fingerprint has no bytes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        // subtle returns false for slices of different length
        self.0.as_slice().ct_eq(other.0.as_slice()).into()
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

impl std::str::FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}
