use const_oid::AssociatedOid;
use der::{Decode, oid::ObjectIdentifier};
use x509_cert::certificate::TbsCertificateInner;

pub use der::flagset::FlagSet;
use x509_cert::ext::pkix::KeyUsage as X509KeyUsage;
pub use x509_cert::ext::pkix::KeyUsages;

use crate::error::Result;

const ANY_EXTENDED_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.37.0");

/// Trait for decoding X.509 extension values.
///
/// Implementors pair an extension OID with the decoding of its DER value into
/// a usable structure. Only the extensions trust validation consults are
/// covered.
pub trait FromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

/// Finds and decodes one extension by its OID.
///
/// Returns `Ok(None)` when the certificate carries no such extension, and an
/// error only when the extension is present but its value does not decode.
/// When an extension OID appears more than once the first occurrence wins.
pub(crate) fn find_extension<T: FromX509Extension>(
    tbs: &TbsCertificateInner,
) -> Result<Option<T>> {
    if let Some(extensions) = tbs.extensions.as_ref() {
        for extension in extensions {
            if extension.extn_id == T::OID {
                return T::from_x509_extension_value(extension.extn_value.as_bytes()).map(Some);
            }
        }
    }
    Ok(None)
}

/// Represents the Subject Key Identifier extension.
///
/// The raw identifier bytes of the subject's public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdentifier(pub Vec<u8>);

impl FromX509Extension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectKeyIdentifier::OID;

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let skid = x509_cert::ext::pkix::SubjectKeyIdentifier::from_der(extension)?;
        Ok(Self(skid.0.as_bytes().to_vec()))
    }
}

/// Represents the Authority Key Identifier (AKI) extension.
///
/// This extension identifies the public key corresponding to the private key
/// used to sign the certificate. Both fields are optional in the encoding;
/// the issuer general-names component is not retained.
///
/// # Fields
/// * `key_identifier` - The issuer's key identifier.
/// * `authority_cert_serial_number` - The issuer's certificate serial number.
#[derive(Debug, Clone, Default)]
pub struct AuthorityKeyIdentifier {
    pub key_identifier: Option<Vec<u8>>,
    pub authority_cert_serial_number: Option<Vec<u8>>,
}

impl FromX509Extension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::AuthorityKeyIdentifier::OID;

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let akid = x509_cert::ext::pkix::AuthorityKeyIdentifier::from_der(extension)?;
        Ok(Self {
            key_identifier: akid.key_identifier.map(|id| id.as_bytes().to_vec()),
            authority_cert_serial_number: akid
                .authority_cert_serial_number
                .map(|sn| sn.as_bytes().to_vec()),
        })
    }
}

/// Represents the Basic Constraints extension.
///
/// This extension indicates whether the certificate is a CA certificate and
/// its path length.
///
/// # Fields
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `max_path_length` - The maximum number of intermediate CAs allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub max_path_length: Option<u32>,
}

impl FromX509Extension for BasicConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::BasicConstraints::OID;

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let bc = x509_cert::ext::pkix::BasicConstraints::from_der(extension)?;
        Ok(Self {
            is_ca: bc.ca,
            max_path_length: bc.path_len_constraint.map(|v| v as u32),
        })
    }
}

/// Represents the Key Usage extension.
///
/// This extension defines the purpose of the key contained in the certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl KeyUsage {
    /// The RFC 5280 names of the set flags, in bit order.
    pub fn flag_names(&self) -> Vec<&'static str> {
        const FLAG_NAMES: [(KeyUsages, &str); 9] = [
            (KeyUsages::DigitalSignature, "digitalSignature"),
            (KeyUsages::NonRepudiation, "nonRepudiation"),
            (KeyUsages::KeyEncipherment, "keyEncipherment"),
            (KeyUsages::DataEncipherment, "dataEncipherment"),
            (KeyUsages::KeyAgreement, "keyAgreement"),
            (KeyUsages::KeyCertSign, "keyCertSign"),
            (KeyUsages::CRLSign, "cRLSign"),
            (KeyUsages::EncipherOnly, "encipherOnly"),
            (KeyUsages::DecipherOnly, "decipherOnly"),
        ];

        FLAG_NAMES
            .iter()
            .filter(|(flag, _)| self.0.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl FromX509Extension for KeyUsage {
    const OID: ObjectIdentifier = <X509KeyUsage as AssociatedOid>::OID;

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let ku = X509KeyUsage::from_der(extension)?;
        Ok(Self(ku.0))
    }
}

/// Represents the Extended Key Usage extension.
///
/// This extension indicates purposes for which the public key may be used.
#[derive(Debug, Clone, Default)]
pub struct ExtendedKeyUsage {
    pub purposes: Vec<ExtendedKeyUsagePurpose>,
}

impl FromX509Extension for ExtendedKeyUsage {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::ExtendedKeyUsage::OID;

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage::from_der(extension)?;
        let purposes = eku.0.iter().map(|oid| (*oid).into()).collect();
        Ok(Self { purposes })
    }
}

/// Represents a purpose carried by the Extended Key Usage extension.
///
/// Unrecognized purposes are preserved as their OID rather than dropped, so
/// that a certificate's property map reflects the full extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedKeyUsagePurpose {
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    TimeStamping,
    OcspSigning,
    Any,
    Other(ObjectIdentifier),
}

impl ExtendedKeyUsagePurpose {
    /// The conventional short name of the purpose, or the dotted OID when the
    /// purpose has none.
    pub fn name(&self) -> String {
        match self {
            ExtendedKeyUsagePurpose::ServerAuth => "serverAuth".to_string(),
            ExtendedKeyUsagePurpose::ClientAuth => "clientAuth".to_string(),
            ExtendedKeyUsagePurpose::CodeSigning => "codeSigning".to_string(),
            ExtendedKeyUsagePurpose::EmailProtection => "emailProtection".to_string(),
            ExtendedKeyUsagePurpose::TimeStamping => "timeStamping".to_string(),
            ExtendedKeyUsagePurpose::OcspSigning => "OCSPSigning".to_string(),
            ExtendedKeyUsagePurpose::Any => "anyExtendedKeyUsage".to_string(),
            ExtendedKeyUsagePurpose::Other(oid) => oid.to_string(),
        }
    }
}

impl From<ObjectIdentifier> for ExtendedKeyUsagePurpose {
    fn from(oid: ObjectIdentifier) -> Self {
        match oid {
            const_oid::db::rfc5912::ID_KP_SERVER_AUTH => ExtendedKeyUsagePurpose::ServerAuth,
            const_oid::db::rfc5912::ID_KP_CLIENT_AUTH => ExtendedKeyUsagePurpose::ClientAuth,
            const_oid::db::rfc5912::ID_KP_CODE_SIGNING => ExtendedKeyUsagePurpose::CodeSigning,
            const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION => {
                ExtendedKeyUsagePurpose::EmailProtection
            }
            const_oid::db::rfc5912::ID_KP_TIME_STAMPING => ExtendedKeyUsagePurpose::TimeStamping,
            const_oid::db::rfc5912::ID_KP_OCSP_SIGNING => ExtendedKeyUsagePurpose::OcspSigning,
            ANY_EXTENDED_KEY_USAGE => ExtendedKeyUsagePurpose::Any,
            _ => ExtendedKeyUsagePurpose::Other(oid),
        }
    }
}
