//! Error taxonomy and process outcome codes.

use std::io;

use pinshell_auth::FingerprintError;

use crate::tls::IdentityError;

/// Fatal outcome kinds, one distinct process exit status each.
///
/// Exit status 0 is reserved for success and for an idle (unconfigured) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExitKind {
    FingerprintDecodeFailed = 1,
    HostUnreachable = 2,
    FingerprintMismatch = 3,
    KeyGenerationFailed = 4,
    RandomnessUnavailable = 5,
    CertificateCreationFailed = 6,
    KeyMarshalFailed = 7,
    KeypairLoadFailed = 8,
    ListenFailed = 9,
    InterpreterStartFailed = 10,
    TlsSetupFailed = 11,
}

impl ExitKind {
    /// Every kind, in exit code order.
    pub const ALL: [ExitKind; 11] = [
        ExitKind::FingerprintDecodeFailed,
        ExitKind::HostUnreachable,
        ExitKind::FingerprintMismatch,
        ExitKind::KeyGenerationFailed,
        ExitKind::RandomnessUnavailable,
        ExitKind::CertificateCreationFailed,
        ExitKind::KeyMarshalFailed,
        ExitKind::KeypairLoadFailed,
        ExitKind::ListenFailed,
        ExitKind::InterpreterStartFailed,
        ExitKind::TlsSetupFailed,
    ];

    /// Process exit status for this kind.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Errors surfaced by the session roles.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ShellError {
    #[error("could not decode pinned fingerprint: {0}")]
    FingerprintDecode(#[from] FingerprintError),

    #[error("host unreachable: {addr}: {source}")]
    HostUnreachable {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("fingerprint mismatch for {addr}: peer presented {presented}")]
    FingerprintMismatch { addr: String, presented: String },

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("failed to listen on {addr}: {source}")]
    ListenFailed {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to build TLS client config: {0}")]
    ClientConfig(#[source] rustls::Error),

    #[error("failed to start interpreter {program}: {source}")]
    InterpreterStart {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl ShellError {
    /// The outcome kind this error terminates the process with.
    pub fn kind(&self) -> ExitKind {
        match self {
            Self::FingerprintDecode(_) => ExitKind::FingerprintDecodeFailed,
            Self::HostUnreachable { .. } => ExitKind::HostUnreachable,
            Self::FingerprintMismatch { .. } => ExitKind::FingerprintMismatch,
            Self::Identity(e) => match e {
                IdentityError::KeyGeneration(_) => ExitKind::KeyGenerationFailed,
                IdentityError::Randomness(_) => ExitKind::RandomnessUnavailable,
                IdentityError::CertificateCreation(_) => ExitKind::CertificateCreationFailed,
                IdentityError::KeyMarshal(_) => ExitKind::KeyMarshalFailed,
                IdentityError::KeypairLoad(_) => ExitKind::KeypairLoadFailed,
            },
            Self::ListenFailed { .. } => ExitKind::ListenFailed,
            Self::InterpreterStart { .. } => ExitKind::InterpreterStartFailed,
            Self::ClientConfig(_) => ExitKind::TlsSetupFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_exit_codes_distinct_and_nonzero() {
        let codes: HashSet<i32> = ExitKind::ALL.iter().map(|k| k.code()).collect();

        assert_eq!(codes.len(), ExitKind::ALL.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn test_identity_errors_map_to_own_kinds() {
        let cases = [
            (IdentityError::KeyGeneration("x".into()), ExitKind::KeyGenerationFailed),
            (IdentityError::Randomness("x".into()), ExitKind::RandomnessUnavailable),
            (
                IdentityError::CertificateCreation("x".into()),
                ExitKind::CertificateCreationFailed,
            ),
            (IdentityError::KeyMarshal("x".into()), ExitKind::KeyMarshalFailed),
            (IdentityError::KeypairLoad("x".into()), ExitKind::KeypairLoadFailed),
        ];

        for (error, expected) in cases {
            assert_eq!(ShellError::from(error).kind(), expected);
        }
    }

    #[test]
    fn test_decode_error_kind() {
        let err = pinshell_auth::Fingerprint::parse_hex("not hex").unwrap_err();
        assert_eq!(
            ShellError::from(err).kind(),
            ExitKind::FingerprintDecodeFailed
        );
    }

    #[test]
    fn test_client_config_error_has_own_kind() {
        let err = ShellError::ClientConfig(rustls::Error::General("no protocol versions".into()));

        assert_eq!(err.kind(), ExitKind::TlsSetupFailed);
        assert_ne!(err.kind(), ExitKind::HostUnreachable);
        assert!(err.to_string().contains("TLS client config"));
    }

    #[test]
    fn test_mismatch_display() {
        let err = ShellError::FingerprintMismatch {
            addr: "10.0.0.1:443".to_string(),
            presented: "AA:BB".to_string(),
        };
        assert_eq!(err.kind(), ExitKind::FingerprintMismatch);
        assert!(err.to_string().contains("AA:BB"));
    }
}
