use thiserror::Error;

use crate::cert::info::CertInfo;

pub type Result<T> = std::result::Result<T, TrustKitError>;

/// Represents errors that can occur in the TrustKit library.
///
/// Validation failures carry the structured property map of the offending
/// certificate so callers can render a meaningful prompt (for example,
/// "self-signed certificate for host X, allow anyway?") instead of a bare
/// message.
#[derive(Debug, Error, Clone)]
pub enum TrustKitError {
    /// The input could not be decoded into a certificate, or the validation
    /// request itself was unusable (empty chain, missing hostname parameter).
    #[error("invalid certificate: {reason}")]
    InvalidCertificate { reason: String, info: CertInfo },

    /// The certificate decoded, but lacks a property the validator requires
    /// unconditionally (subject/issuer name, validity window, subject key id).
    #[error("certificate is missing required property: {property}")]
    MalformedCertificate { property: String, info: CertInfo },

    /// The validation time falls outside the certificate's validity window.
    #[error("certificate expired or not yet valid at {validation_time}")]
    ExpiredOrNotYetValid {
        validation_time: time::OffsetDateTime,
        info: CertInfo,
    },

    /// Key usage or extended key usage does not permit the requested role.
    #[error("certificate key usage violation")]
    KeyUsageViolation { info: CertInfo },

    /// Basic constraints mark the certificate as not-a-CA, or its path
    /// length is exceeded at the current chain depth.
    #[error("certificate basic constraints violation")]
    BasicConstraintsViolation { info: CertInfo },

    /// A chain link's signature does not verify against the claimed issuer's
    /// public key.
    #[error("certificate signature could not be verified against its issuer")]
    InvalidSignature { info: CertInfo },

    /// The presented hostname does not match the certificate's common name.
    #[error("hostname {hostname:?} does not match the certificate")]
    HostnameMismatch { hostname: String, info: CertInfo },

    /// The chain was walked to its end without reaching a trust anchor.
    #[error("certificate chain does not terminate at a trusted authority")]
    UntrustedChain { info: CertInfo },

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error reading or writing a persisted store file.
    #[error("I/O error: {0}")]
    Io(String),
}

impl TrustKitError {
    /// The property map of the certificate this error refers to, if any.
    pub fn cert_info(&self) -> Option<&CertInfo> {
        match self {
            TrustKitError::InvalidCertificate { info, .. }
            | TrustKitError::MalformedCertificate { info, .. }
            | TrustKitError::ExpiredOrNotYetValid { info, .. }
            | TrustKitError::KeyUsageViolation { info }
            | TrustKitError::BasicConstraintsViolation { info }
            | TrustKitError::InvalidSignature { info }
            | TrustKitError::HostnameMismatch { info, .. }
            | TrustKitError::UntrustedChain { info } => Some(info),
            _ => None,
        }
    }
}

impl From<der::Error> for TrustKitError {
    /// Converts a `der::Error` into a `TrustKitError`.
    fn from(err: der::Error) -> Self {
        TrustKitError::DecodingError(err.to_string())
    }
}

impl From<std::io::Error> for TrustKitError {
    fn from(err: std::io::Error) -> Self {
        TrustKitError::Io(err.to_string())
    }
}

impl From<pem::PemError> for TrustKitError {
    fn from(err: pem::PemError) -> Self {
        TrustKitError::DecodingError(err.to_string())
    }
}
