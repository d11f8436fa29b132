//! Certificate inspection for X.509 DER input.
//!
//! # Security
//!
//! - Input is limited to 16KB to prevent DoS
//! - The x509_parser library handles ASN.1 parsing safely
//! - Nothing here takes part in the trust decision; pinning hashes raw DER

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use thiserror::Error;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::*;

/// Maximum certificate size (16KB is generous for a single cert)
pub const MAX_CERT_SIZE: usize = 16 * 1024;

/// Errors that can occur during certificate parsing.
#[derive(Debug, Error)]
pub enum CertError {
    #[error("certificate too large: {0} bytes (max {MAX_CERT_SIZE})")]
    TooLarge(usize),

    #[error("failed to parse X.509 certificate: {0}")]
    ParseError(String),
}

/// Fields of a certificate worth reporting about a server identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertInfo {
    /// Serial number as encoded (big-endian, may carry a leading sign byte).
    pub serial: Vec<u8>,
    /// Start of validity, seconds since the Unix epoch.
    pub not_before: i64,
    /// End of validity, seconds since the Unix epoch.
    pub not_after: i64,
    /// Organization names from the subject.
    pub organizations: Vec<String>,
    /// IP subject alternative names.
    pub san_ips: Vec<IpAddr>,
    /// Basic constraints CA flag.
    pub is_ca: bool,
    /// Whether the extended key usage includes server authentication.
    pub server_auth: bool,
    /// Subject and issuer are the same name.
    pub self_issued: bool,
}

impl CertInfo {
    /// Length of the validity window in seconds.
    #[must_use]
    pub fn validity_secs(&self) -> i64 {
        self.not_after - self.not_before
    }
}

/// Parse the reportable fields out of a DER-encoded certificate.
///
/// # Errors
///
/// Returns `CertError::TooLarge` if certificate exceeds 16KB.
/// Returns `CertError::ParseError` if the certificate or one of the inspected
/// extensions is malformed.
pub fn inspect_certificate(cert_der: &[u8]) -> Result<CertInfo, CertError> {
    // Input size validation (DoS protection)
    if cert_der.len() > MAX_CERT_SIZE {
        return Err(CertError::TooLarge(cert_der.len()));
    }

    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| CertError::ParseError(format!("{:?}", e)))?;

    let organizations = cert
        .subject()
        .iter_organization()
        .filter_map(|attr| attr.as_str().ok().map(str::to_string))
        .collect();

    let san_ips = cert
        .subject_alternative_name()
        .map_err(|e| CertError::ParseError(e.to_string()))?
        .map(|ext| {
            ext.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::IPAddress(bytes) => ip_from_bytes(bytes),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let is_ca = cert
        .basic_constraints()
        .map_err(|e| CertError::ParseError(e.to_string()))?
        .is_some_and(|ext| ext.value.ca);

    let server_auth = cert
        .extended_key_usage()
        .map_err(|e| CertError::ParseError(e.to_string()))?
        .is_some_and(|ext| ext.value.server_auth);

    Ok(CertInfo {
        serial: cert.raw_serial().to_vec(),
        not_before: cert.validity().not_before.timestamp(),
        not_after: cert.validity().not_after.timestamp(),
        organizations,
        san_ips,
        is_ca,
        server_auth,
        self_issued: cert.subject().as_raw() == cert.issuer().as_raw(),
    })
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        _ => None,
    }
}
