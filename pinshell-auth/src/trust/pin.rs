//! Match-any fingerprint pinning over a presented certificate chain.
//!
//! Pinning replaces CA chain validation entirely: a peer is trusted when any
//! certificate it presented hashes to the pinned fingerprint. Pinning the leaf
//! or an issuing authority are both accepted, and chain order is irrelevant.

use crate::identity::Fingerprint;

/// Result of checking a presented chain against a pinned fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PinDecision {
    /// At least one certificate matched. `index` is the first matching position.
    Trusted { index: usize },
    /// No certificate in the chain matched (including an empty chain).
    Mismatch {
        /// Fingerprints of every presented certificate, in received order.
        presented: Vec<Fingerprint>,
    },
}

impl PinDecision {
    /// Whether the chain is trusted.
    #[must_use]
    pub fn is_trusted(&self) -> bool {
        matches!(self, Self::Trusted { .. })
    }
}

/// Evaluate a presented chain against the pinned fingerprint.
///
/// Every certificate is hashed and compared; there is no early exit, so the
/// work done does not depend on where (or whether) a match occurs.
#[must_use]
pub fn evaluate_chain<C>(chain: &[C], pinned: &Fingerprint) -> PinDecision
where
    C: AsRef<[u8]>,
{
    let presented: Vec<Fingerprint> = chain
        .iter()
        .map(|cert| Fingerprint::of_certificate(cert.as_ref()))
        .collect();

    let mut matched = None;
    for (index, fingerprint) in presented.iter().enumerate() {
        if fingerprint == pinned && matched.is_none() {
            matched = Some(index);
        }
    }

    match matched {
        Some(index) => PinDecision::Trusted { index },
        None => PinDecision::Mismatch { presented },
    }
}

/// Return `true` iff any certificate in `chain` hashes to `pinned`.
#[must_use]
pub fn check_key_pin<C>(chain: &[C], pinned: &Fingerprint) -> bool
where
    C: AsRef<[u8]>,
{
    evaluate_chain(chain, pinned).is_trusted()
}
