//! TLS configuration for both connection roles.
//!
//! Provides the ephemeral server identity, the listener's server config and
//! the initiator's client config. Both sides use the aws-lc-rs provider
//! explicitly, which is also what makes P-521 keys usable.

mod cert;
mod client;
mod server;

use std::sync::Arc;

use rustls::crypto::CryptoProvider;

pub use cert::{
    build_self_signed, generate, local_san_ips, CertParams, IdentityError, ServerIdentity,
    ORGANIZATION, SERIAL_LEN, VALIDITY_DAYS,
};
pub use client::{build_client_config, SkipChainVerifier};
pub use server::build_server_config;

/// The crypto provider shared by every TLS config in the process.
pub fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::aws_lc_rs::default_provider())
}
