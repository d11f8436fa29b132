//! TLS client configuration for the initiator role.
//!
//! # Verifiers
//!
//! - [`SkipChainVerifier`]: accepts any server chain during the handshake.
//!   Trust is decided afterwards by fingerprint pinning over the observed
//!   chain, never by CA signatures, expiry or names.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};

/// Certificate verifier that skips chain validation.
///
/// Handshake signatures are still checked, so the server must hold the private
/// key for the certificate it presents. Without that, pinning a certificate
/// would pin nothing.
#[derive(Debug)]
pub struct SkipChainVerifier {
    provider: Arc<CryptoProvider>,
}

impl SkipChainVerifier {
    /// Create a verifier backed by the process crypto provider.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            provider: super::crypto_provider(),
        })
    }
}

impl ServerCertVerifier for SkipChainVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Build the initiator's TLS client config.
///
/// No client certificate is offered; trust is one-directional.
pub fn build_client_config() -> Result<Arc<ClientConfig>, rustls::Error> {
    let config = ClientConfig::builder_with_provider(super::crypto_provider())
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(SkipChainVerifier::new())
        .with_no_client_auth();

    Ok(Arc::new(config))
}
