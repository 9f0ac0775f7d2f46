#![allow(dead_code)]

use std::str::FromStr;

use bon::Builder;
use const_oid::{AssociatedOid, ObjectIdentifier};
use der::Encode;
use der::asn1::{BitString, OctetString, UtcTime};
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{DerSignature, SigningKey};
use rand_core::OsRng;
use sha1::{Digest, Sha1};
use time::{Duration, OffsetDateTime};
use x509_cert::Version;
use x509_cert::certificate::{CertificateInner, TbsCertificateInner};
use x509_cert::ext::Extension;
use x509_cert::ext::pkix;
use x509_cert::name::RdnSequence;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::time::{Time, Validity};

use trustkit::cert::Certificate;
use trustkit::cert::extensions::{FlagSet, KeyUsages};

/// A certificate together with the private key that can sign on its behalf,
/// for building test hierarchies.
pub struct CertificateWithKey {
    pub cert: Certificate,
    pub key: SigningKey,
}

/// Parameters for issuing one test certificate.
#[derive(Builder)]
pub struct CertParams<'a> {
    pub common_name: &'a str,
    #[builder(default)]
    pub is_ca: bool,
    pub path_length: Option<u8>,
    #[builder(default)]
    pub server: bool,
    pub key_usage: Option<FlagSet<KeyUsages>>,
    pub extended_key_usage: Option<Vec<ObjectIdentifier>>,
    pub not_before: Option<OffsetDateTime>,
    pub not_after: Option<OffsetDateTime>,
    #[builder(default)]
    pub omit_subject_key_id: bool,
    pub serial: Option<Vec<u8>>,
}

/// Issues an ECDSA P-256 certificate from the given parameters, self-signed
/// when `issuer` is `None`.
pub fn issue(params: &CertParams<'_>, issuer: Option<&CertificateWithKey>) -> CertificateWithKey {
    let key = SigningKey::random(&mut OsRng);
    let public_key = SubjectPublicKeyInfoOwned::from_key(*key.verifying_key()).unwrap();

    let subject = name(params.common_name);
    let (issuer_name, signing_key) = match issuer {
        Some(authority) => (
            authority.cert.as_x509().tbs_certificate.subject.clone(),
            &authority.key,
        ),
        None => (subject.clone(), &key),
    };

    let not_before = params
        .not_before
        .unwrap_or_else(|| OffsetDateTime::now_utc() - Duration::days(1));
    let not_after = params
        .not_after
        .unwrap_or_else(|| OffsetDateTime::now_utc() + Duration::days(365));
    let validity = Validity {
        not_before: Time::UtcTime(UtcTime::from_system_time(not_before.into()).unwrap()),
        not_after: Time::UtcTime(UtcTime::from_system_time(not_after.into()).unwrap()),
    };

    let serial = params.serial.clone().unwrap_or_else(|| vec![1]);

    let mut extensions = Vec::new();

    if !params.omit_subject_key_id {
        let key_id = Sha1::digest(public_key.subject_public_key.raw_bytes());
        extensions.push(extension(
            &pkix::SubjectKeyIdentifier(OctetString::new(key_id.as_slice()).unwrap()),
            false,
        ));
    }

    if let Some(authority) = issuer {
        let authority_tbs = &authority.cert.as_x509().tbs_certificate;
        let authority_key_id = Sha1::digest(
            authority_tbs
                .subject_public_key_info
                .subject_public_key
                .raw_bytes(),
        );
        extensions.push(extension(
            &pkix::AuthorityKeyIdentifier {
                key_identifier: Some(OctetString::new(authority_key_id.as_slice()).unwrap()),
                authority_cert_issuer: None,
                authority_cert_serial_number: Some(authority_tbs.serial_number.clone()),
            },
            false,
        ));
    }

    if params.is_ca || params.path_length.is_some() {
        extensions.push(extension(
            &pkix::BasicConstraints {
                ca: params.is_ca,
                path_len_constraint: params.path_length,
            },
            true,
        ));
    }

    let key_usage = params.key_usage.or_else(|| {
        if params.is_ca {
            Some(KeyUsages::KeyCertSign | KeyUsages::CRLSign)
        } else if params.server {
            Some(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment)
        } else {
            None
        }
    });
    if let Some(flags) = key_usage {
        extensions.push(extension(&pkix::KeyUsage(flags), true));
    }

    let extended_key_usage = params.extended_key_usage.clone().or_else(|| {
        params
            .server
            .then(|| vec![const_oid::db::rfc5912::ID_KP_SERVER_AUTH])
    });
    if let Some(purposes) = extended_key_usage {
        extensions.push(extension(&pkix::ExtendedKeyUsage(purposes), false));
    }

    let tbs = TbsCertificateInner {
        version: Version::V3,
        serial_number: SerialNumber::new(&serial).unwrap(),
        signature: ecdsa_with_sha256(),
        issuer: issuer_name,
        validity,
        subject,
        subject_public_key_info: public_key,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: Some(extensions),
    };

    let signature: DerSignature = signing_key.sign(&tbs.to_der().unwrap());
    let cert = CertificateInner {
        tbs_certificate: tbs,
        signature_algorithm: ecdsa_with_sha256(),
        signature: BitString::from_bytes(signature.as_ref()).unwrap(),
    };

    CertificateWithKey {
        cert: Certificate::from_x509(cert),
        key,
    }
}

/// A self-signed CA certificate.
pub fn root_ca(common_name: &str) -> CertificateWithKey {
    issue(
        &CertParams::builder()
            .common_name(common_name)
            .is_ca(true)
            .build(),
        None,
    )
}

/// A CA certificate signed by `issuer`.
pub fn intermediate_ca(common_name: &str, issuer: &CertificateWithKey) -> CertificateWithKey {
    issue(
        &CertParams::builder()
            .common_name(common_name)
            .is_ca(true)
            .build(),
        Some(issuer),
    )
}

/// A TLS server certificate signed by `issuer`.
pub fn server_cert(common_name: &str, issuer: &CertificateWithKey) -> CertificateWithKey {
    issue(
        &CertParams::builder()
            .common_name(common_name)
            .server(true)
            .build(),
        Some(issuer),
    )
}

/// Returns a copy of the certificate whose signature no longer verifies.
pub fn tamper_signature(cert: &Certificate) -> Certificate {
    let mut der = cert.to_der().unwrap();
    let last = der.len() - 1;
    der[last] ^= 0x01;
    Certificate::from_der(&der).unwrap()
}

/// Concatenates certificates into a PEM bundle string.
pub fn pem_bundle(certs: &[&Certificate]) -> String {
    let mut bundle = String::new();
    for cert in certs {
        bundle.push_str(&cert.to_pem().unwrap());
        bundle.push('\n');
    }
    bundle
}

fn name(common_name: &str) -> RdnSequence {
    RdnSequence::from_str(&format!("CN={common_name},O=TrustKit Test")).unwrap()
}

fn ecdsa_with_sha256() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
        parameters: None,
    }
}

fn extension<T: Encode + AssociatedOid>(value: &T, critical: bool) -> Extension {
    Extension {
        extn_id: T::OID,
        critical,
        extn_value: OctetString::new(value.to_der().unwrap()).unwrap(),
    }
}
