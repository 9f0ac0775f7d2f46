//! Signature verification for certificate chain links.

use const_oid::AssociatedOid;
use der::Encode;
use rsa::RsaPublicKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs1v15::{Signature as RsaSignature, VerifyingKey as RsaVerifyingKey};
use rsa::signature::Verifier;
use rsa::signature::digest::Digest;
use sha2::{Sha256, Sha384, Sha512};
use tracing::warn;

use crate::cert::{Certificate, SignatureAlgorithm};

/// Verifies that `child`'s signature was produced by `issuer`'s public key.
///
/// The child's to-be-signed portion is re-encoded to DER and checked against
/// the signature bits using the child's declared signature algorithm and the
/// issuer's subject public key. Any mismatch between the algorithm and the
/// key type, or an algorithm this library cannot verify, fails verification
/// with a logged reason rather than an error.
pub fn verify_signature(issuer: &Certificate, child: &Certificate) -> bool {
    let subject = child.subject_name_string().unwrap_or_default().to_string();

    let algorithm = match SignatureAlgorithm::from_oid(child.as_x509().signature_algorithm.oid) {
        Some(algorithm) => algorithm,
        None => {
            warn!(
                "unsupported signature algorithm {} on certificate {}",
                child.as_x509().signature_algorithm.oid,
                subject
            );
            return false;
        }
    };

    let message = match child.as_x509().tbs_certificate.to_der() {
        Ok(message) => message,
        Err(e) => {
            warn!("could not re-encode certificate {} for verification: {}", subject, e);
            return false;
        }
    };

    let signature = match child.as_x509().signature.as_bytes() {
        Some(signature) => signature,
        None => {
            warn!("certificate {} carries a malformed signature bit string", subject);
            return false;
        }
    };

    let spki = &issuer.as_x509().tbs_certificate.subject_public_key_info;
    let key_bytes = match spki.subject_public_key.as_bytes() {
        Some(key_bytes) => key_bytes,
        None => {
            warn!("issuer of certificate {} carries a malformed public key bit string", subject);
            return false;
        }
    };

    let verified = match algorithm {
        SignatureAlgorithm::Sha256WithRSA => verify_rsa::<Sha256>(key_bytes, &message, signature),
        SignatureAlgorithm::Sha384WithRSA => verify_rsa::<Sha384>(key_bytes, &message, signature),
        SignatureAlgorithm::Sha512WithRSA => verify_rsa::<Sha512>(key_bytes, &message, signature),
        SignatureAlgorithm::Sha256WithECDSA => {
            match (
                p256::ecdsa::VerifyingKey::from_sec1_bytes(key_bytes),
                p256::ecdsa::Signature::from_der(signature),
            ) {
                (Ok(key), Ok(signature)) => key.verify(&message, &signature).is_ok(),
                _ => false,
            }
        }
        SignatureAlgorithm::Sha384WithECDSA => {
            match (
                p384::ecdsa::VerifyingKey::from_sec1_bytes(key_bytes),
                p384::ecdsa::Signature::from_der(signature),
            ) {
                (Ok(key), Ok(signature)) => key.verify(&message, &signature).is_ok(),
                _ => false,
            }
        }
        SignatureAlgorithm::Sha512WithECDSA => {
            match (
                p521::ecdsa::VerifyingKey::from_sec1_bytes(key_bytes),
                p521::ecdsa::Signature::from_der(signature),
            ) {
                (Ok(key), Ok(signature)) => key.verify(&message, &signature).is_ok(),
                _ => false,
            }
        }
        SignatureAlgorithm::Ed25519 => verify_ed25519(key_bytes, &message, signature),
    };

    if !verified {
        warn!("signature verification failed for certificate {}", subject);
    }
    verified
}

fn verify_rsa<D>(key_bytes: &[u8], message: &[u8], signature: &[u8]) -> bool
where
    D: Digest + AssociatedOid,
{
    let key = match RsaPublicKey::from_pkcs1_der(key_bytes) {
        Ok(key) => key,
        Err(_) => return false,
    };
    let signature = match RsaSignature::try_from(signature) {
        Ok(signature) => signature,
        Err(_) => return false,
    };
    RsaVerifyingKey::<D>::new(key)
        .verify(message, &signature)
        .is_ok()
}

fn verify_ed25519(key_bytes: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let key_bytes: [u8; 32] = match key_bytes.try_into() {
        Ok(key_bytes) => key_bytes,
        Err(_) => return false,
    };
    let key = match ed25519_dalek::VerifyingKey::from_bytes(&key_bytes) {
        Ok(key) => key,
        Err(_) => return false,
    };
    match ed25519_dalek::Signature::from_slice(signature) {
        Ok(signature) => key.verify(message, &signature).is_ok(),
        Err(_) => false,
    }
}
