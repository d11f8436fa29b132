//! Trust primitives for fingerprint pinning.

mod pin;

pub use pin::{check_key_pin, evaluate_chain, PinDecision};
