use std::ops::Deref;

use tracing::debug;

use crate::cert::Certificate;
use crate::cert::info::{self, CertInfo};
use crate::vector::CertificateVector;

/// An ordered certificate chain, leaf first.
///
/// Position 0 is the end-entity certificate; each following certificate is
/// the issuer of the one before it, as far as issuers could be found. The
/// chain is built once and read-only afterwards.
#[derive(Debug, Clone)]
pub struct CertificateChain {
    certs: CertificateVector,
}

impl CertificateChain {
    /// Builds a chain from a leaf certificate and a pool of untrusted
    /// intermediates, typically the extra certificates presented during a
    /// TLS handshake.
    ///
    /// Starting from the leaf, the pool is searched for a certificate whose
    /// subject name matches the current certificate's issuer name; the first
    /// match is moved from the pool into the chain and the walk continues
    /// from it. The walk stops when no issuer is found, so the chain may be
    /// shorter than the pool, and the pool may contain leftovers that are
    /// simply dropped. The trust anchor itself is not expected here; it is
    /// located in a store during validation.
    pub fn build(leaf: Certificate, mut untrusted: CertificateVector) -> Self {
        let mut certs = CertificateVector::new();
        let mut current = leaf.clone();
        certs.add(leaf);

        loop {
            let issuer_name = match current.issuer_name_string() {
                Some(issuer_name) => issuer_name.to_string(),
                None => break,
            };

            let mut search = CertInfo::new();
            search.insert(
                info::SUBJECT_NAME_STRING.to_string(),
                serde_json::Value::String(issuer_name),
            );

            match untrusted.find(&search).and_then(|index| untrusted.erase(index)) {
                Some(issuer) => {
                    current = issuer.clone();
                    certs.add(issuer);
                }
                None => break,
            }
        }

        if !untrusted.is_empty() {
            debug!(
                "{} certificate(s) in the untrusted pool did not join the chain",
                untrusted.len()
            );
        }

        Self { certs }
    }
}

impl Deref for CertificateChain {
    type Target = CertificateVector;

    fn deref(&self) -> &Self::Target {
        &self.certs
    }
}
