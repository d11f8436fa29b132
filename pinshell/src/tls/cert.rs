//! Ephemeral self-signed server identity.
//!
//! Generated fresh each time a listener starts, never written to disk. The
//! certificate is its own authority (CA flag set) because initiators only ever
//! check its SHA-256 fingerprint, never a trust store.

use std::net::IpAddr;

use pinshell_auth::{inspect_certificate, Fingerprint};
use rand::rngs::OsRng;
use rand::RngCore;
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose,
    IsCa, KeyPair, KeyUsagePurpose, SanType, SerialNumber, PKCS_ECDSA_P521_SHA512,
};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use zeroize::Zeroizing;

/// Organization name written into every generated certificate.
pub const ORGANIZATION: &str = "pinshell";

/// Certificate lifetime.
pub const VALIDITY_DAYS: i64 = 365;

/// Serial number length in bytes (128 bits).
pub const SERIAL_LEN: usize = 16;

/// Parameters for certificate generation.
#[derive(Debug, Clone)]
pub struct CertParams {
    /// Subject organization name
    pub organization: String,
    /// Validity period in days
    pub validity_days: i64,
    /// Subject alternative names (IP addresses)
    pub san_ips: Vec<IpAddr>,
}

impl Default for CertParams {
    fn default() -> Self {
        Self {
            organization: ORGANIZATION.to_string(),
            validity_days: VALIDITY_DAYS,
            san_ips: Vec::new(),
        }
    }
}

impl CertParams {
    /// Default parameters naming every non-loopback local address.
    pub fn for_local_interfaces() -> Self {
        Self {
            san_ips: local_san_ips(),
            ..Default::default()
        }
    }
}

/// Server certificate and private key, ready for the TLS library.
pub struct ServerIdentity {
    /// Certificate in DER format
    pub cert_der: CertificateDer<'static>,
    /// Private key reloaded from its PEM encoding
    key_der: PrivateKeyDer<'static>,
    /// SHA-256 of `cert_der`, the value initiators pin
    pub fingerprint: Fingerprint,
}

impl ServerIdentity {
    /// Borrow a copy of the private key for a TLS config.
    pub fn key_der(&self) -> PrivateKeyDer<'static> {
        self.key_der.clone_key()
    }
}

impl std::fmt::Debug for ServerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerIdentity")
            .field("fingerprint", &self.fingerprint)
            .field("cert_der_len", &self.cert_der.len())
            .finish()
    }
}

/// Errors that can occur while generating the server identity.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum IdentityError {
    #[error("failed to generate key pair: {0}")]
    KeyGeneration(String),
    #[error("secure randomness unavailable: {0}")]
    Randomness(String),
    #[error("failed to create certificate: {0}")]
    CertificateCreation(String),
    #[error("failed to marshal private key: {0}")]
    KeyMarshal(String),
    #[error("failed to load key pair: {0}")]
    KeypairLoad(String),
}

/// Generate the listener identity for this process.
pub fn generate() -> Result<ServerIdentity, IdentityError> {
    let identity = build_self_signed(&CertParams::for_local_interfaces())?;

    match inspect_certificate(&identity.cert_der) {
        Ok(info) => tracing::debug!(
            serial = %hex::encode_upper(&info.serial),
            not_after = info.not_after,
            san_ips = ?info.san_ips,
            "Generated listener identity"
        ),
        Err(e) => tracing::warn!(error = %e, "Generated certificate does not parse"),
    }

    Ok(identity)
}

/// Generate a P-521 key and a self-signed certificate for it.
pub fn build_self_signed(params: &CertParams) -> Result<ServerIdentity, IdentityError> {
    let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P521_SHA512)
        .map_err(|e| IdentityError::KeyGeneration(e.to_string()))?;
    let serial = random_serial()?;

    let mut cert_params = CertificateParams::default();
    cert_params.distinguished_name = DistinguishedName::new();
    cert_params
        .distinguished_name
        .push(DnType::OrganizationName, &params.organization);
    cert_params.serial_number = Some(SerialNumber::from_slice(&serial));

    cert_params.not_before = time::OffsetDateTime::now_utc();
    cert_params.not_after = cert_params.not_before + time::Duration::days(params.validity_days);

    cert_params.key_usages = vec![
        KeyUsagePurpose::KeyEncipherment,
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyCertSign,
    ];
    cert_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    cert_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);

    for ip in &params.san_ips {
        cert_params.subject_alt_names.push(SanType::IpAddress(*ip));
    }

    let cert = cert_params
        .self_signed(&key_pair)
        .map_err(|e| IdentityError::CertificateCreation(e.to_string()))?;

    let (cert_pem, key_pem) = marshal(&cert, &key_pair)?;
    load_keypair(&cert_pem, &key_pem)
}

/// Non-loopback addresses of every local interface.
///
/// Enumeration failure only costs the SANs, so it is logged and not fatal.
pub fn local_san_ips() -> Vec<IpAddr> {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces
            .into_iter()
            .map(|iface| iface.ip())
            .filter(|ip| !ip.is_loopback())
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to enumerate local interfaces");
            Vec::new()
        }
    }
}

fn random_serial() -> Result<[u8; SERIAL_LEN], IdentityError> {
    let mut serial = [0u8; SERIAL_LEN];
    OsRng
        .try_fill_bytes(&mut serial)
        .map_err(|e| IdentityError::Randomness(e.to_string()))?;
    Ok(serial)
}

/// PEM-encode certificate and key.
fn marshal(
    cert: &rcgen::Certificate,
    key_pair: &KeyPair,
) -> Result<(String, Zeroizing<String>), IdentityError> {
    let key_der = Zeroizing::new(key_pair.serialize_der());
    PrivateKeyDer::try_from(key_der.as_slice())
        .map_err(|e| IdentityError::KeyMarshal(e.to_string()))?;

    Ok((cert.pem(), Zeroizing::new(key_pair.serialize_pem())))
}

/// Rebuild a loadable key pair from its PEM encoding.
fn load_keypair(cert_pem: &str, key_pem: &str) -> Result<ServerIdentity, IdentityError> {
    let cert_der = CertificateDer::from_pem_slice(cert_pem.as_bytes())
        .map_err(|e| IdentityError::KeypairLoad(e.to_string()))?;
    let key_der = PrivateKeyDer::from_pem_slice(key_pem.as_bytes())
        .map_err(|e| IdentityError::KeypairLoad(e.to_string()))?;

    // The provider must accept the key for signing, or the handshake would fail later
    super::crypto_provider()
        .key_provider
        .load_private_key(key_der.clone_key())
        .map_err(|e| IdentityError::KeypairLoad(e.to_string()))?;

    let fingerprint = Fingerprint::of_certificate(&cert_der);

    Ok(ServerIdentity {
        cert_der,
        key_der,
        fingerprint,
    })
}
