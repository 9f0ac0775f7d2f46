pub mod extensions;
pub mod info;

use std::sync::{Arc, OnceLock};

use der::oid::ObjectIdentifier;
use der::{Decode, DecodePem, Encode, EncodePem};
use serde_json::Value;
use time::OffsetDateTime;
use x509_cert::certificate::CertificateInner;

use crate::error::{Result, TrustKitError};
use info::CertInfo;

/// Represents the supported signature algorithms for certificates.
///
/// This enum provides a mapping from the corresponding OIDs for each algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption.
    Sha256WithRSA,
    /// SHA-384 with RSA encryption.
    Sha384WithRSA,
    /// SHA-512 with RSA encryption.
    Sha512WithRSA,
    /// SHA-256 with ECDSA.
    Sha256WithECDSA,
    /// SHA-384 with ECDSA.
    Sha384WithECDSA,
    /// SHA-512 with ECDSA.
    Sha512WithECDSA,
    /// Ed25519.
    Ed25519,
}

impl SignatureAlgorithm {
    /// Maps a signature algorithm OID to the corresponding variant.
    ///
    /// # Returns
    /// `None` for algorithms this library cannot verify.
    pub fn from_oid(oid: ObjectIdentifier) -> Option<Self> {
        match oid {
            const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION => {
                Some(SignatureAlgorithm::Sha256WithRSA)
            }
            const_oid::db::rfc5912::SHA_384_WITH_RSA_ENCRYPTION => {
                Some(SignatureAlgorithm::Sha384WithRSA)
            }
            const_oid::db::rfc5912::SHA_512_WITH_RSA_ENCRYPTION => {
                Some(SignatureAlgorithm::Sha512WithRSA)
            }
            const_oid::db::rfc5912::ECDSA_WITH_SHA_256 => Some(SignatureAlgorithm::Sha256WithECDSA),
            const_oid::db::rfc5912::ECDSA_WITH_SHA_384 => Some(SignatureAlgorithm::Sha384WithECDSA),
            const_oid::db::rfc5912::ECDSA_WITH_SHA_512 => Some(SignatureAlgorithm::Sha512WithECDSA),
            const_oid::db::rfc8410::ID_ED_25519 => Some(SignatureAlgorithm::Ed25519),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct CertData {
    x509: CertificateInner,
    info: OnceLock<CertInfo>,
}

/// Represents one decoded X.509 certificate.
///
/// A `Certificate` is immutable once constructed and cheap to clone: clones
/// share the decoded structure and the memoized property map, so the same
/// certificate object can live in a store and in a chain under validation at
/// the same time.
#[derive(Debug, Clone)]
pub struct Certificate {
    data: Arc<CertData>,
}

impl Certificate {
    /// Parses a certificate from a single PEM block.
    ///
    /// # Returns
    /// The decoded certificate, or `InvalidCertificate` when the input is not
    /// a well-formed PEM-encoded certificate.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let inner =
            CertificateInner::from_pem(pem.as_bytes()).map_err(|e| {
                TrustKitError::InvalidCertificate {
                    reason: format!("could not parse PEM certificate: {e}"),
                    info: CertInfo::new(),
                }
            })?;
        Ok(Self::from_x509(inner))
    }

    /// Parses a certificate from DER bytes.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(der).map_err(|e| {
            TrustKitError::InvalidCertificate {
                reason: format!("could not parse DER certificate: {e}"),
                info: CertInfo::new(),
            }
        })?;
        Ok(Self::from_x509(inner))
    }

    /// Wraps an already decoded `x509_cert` certificate structure.
    pub fn from_x509(x509: CertificateInner) -> Self {
        Self {
            data: Arc::new(CertData {
                x509,
                info: OnceLock::new(),
            }),
        }
    }

    /// Encodes the certificate into DER format.
    ///
    /// # Returns
    /// A byte vector containing the DER-encoded certificate.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.data
            .x509
            .to_der()
            .map_err(|e| TrustKitError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    ///
    /// # Returns
    /// A string containing the PEM-encoded certificate.
    pub fn to_pem(&self) -> Result<String> {
        self.data
            .x509
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| TrustKitError::EncodingError(e.to_string()))
    }

    /// The underlying `x509_cert` certificate structure.
    pub fn as_x509(&self) -> &CertificateInner {
        &self.data.x509
    }

    /// The certificate's property map, derived on first access and memoized.
    pub fn info(&self) -> &CertInfo {
        self.data
            .info
            .get_or_init(|| info::build_info(&self.data.x509.tbs_certificate))
    }

    /// The subject key identifier in lowercase colon-hex form, when the
    /// certificate carries the extension.
    pub fn subject_key_id(&self) -> Option<&str> {
        self.info()
            .get(info::SUBJECT_KEY_IDENTIFIER)
            .and_then(Value::as_str)
    }

    /// The subject distinguished name in RFC 4514 display form.
    pub fn subject_name_string(&self) -> Option<&str> {
        self.info()
            .get(info::SUBJECT_NAME_STRING)
            .and_then(Value::as_str)
    }

    /// The issuer distinguished name in RFC 4514 display form.
    pub fn issuer_name_string(&self) -> Option<&str> {
        self.info()
            .get(info::ISSUER_NAME_STRING)
            .and_then(Value::as_str)
    }

    /// The common name attribute of the subject, when present.
    pub fn common_name(&self) -> Option<&str> {
        self.info()
            .get(info::SUBJECT_NAME)
            .and_then(|name| name.get(info::COMMON_NAME))
            .and_then(Value::as_str)
    }

    /// Start of the validity window.
    pub fn not_before(&self) -> OffsetDateTime {
        info::decode_time(&self.data.x509.tbs_certificate.validity.not_before)
    }

    /// End of the validity window.
    pub fn not_after(&self) -> OffsetDateTime {
        info::decode_time(&self.data.x509.tbs_certificate.validity.not_after)
    }
}
