//! Listener-side TLS configuration.

use std::sync::Arc;

use rustls::ServerConfig;

use super::cert::{IdentityError, ServerIdentity};

/// Server config presenting `identity`, with no client authentication.
///
/// Connecting peers are never asked for a certificate; anyone who can reach
/// the listener may open a session.
pub fn build_server_config(identity: &ServerIdentity) -> Result<Arc<ServerConfig>, IdentityError> {
    let config = ServerConfig::builder_with_provider(super::crypto_provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| IdentityError::KeypairLoad(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(vec![identity.cert_der.clone()], identity.key_der())
        .map_err(|e| IdentityError::KeypairLoad(e.to_string()))?;

    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::cert::{build_self_signed, CertParams};

    #[test]
    fn test_server_config_accepts_connections() {
        let identity = build_self_signed(&CertParams::default()).unwrap();

        let config = build_server_config(&identity).unwrap();

        assert!(config.alpn_protocols.is_empty());
        assert!(rustls::ServerConnection::new(config).is_ok());
    }
}
