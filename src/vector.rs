use std::ops::{Deref, DerefMut};

use serde_json::Value;
use tracing::{debug, warn};

use crate::cert::Certificate;
use crate::cert::info::{self, CertInfo};

/// An ordered collection of certificates with identity by subject key id.
///
/// Two certificates are considered the same entry when their subject key
/// identifiers match; insertion is idempotent under that identity, and
/// certificates without a subject key identifier are refused outright since
/// they could never be found or deduplicated later. Both refusals are logged
/// and silent. Positional access and iteration are available through `Deref`
/// to a slice.
#[derive(Debug, Clone, Default)]
pub struct CertificateVector {
    certs: Vec<Certificate>,
}

impl CertificateVector {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds the first certificate whose property map matches `params`.
    ///
    /// Every key in `params` must be present in the candidate's map with a
    /// value equal under [`info::value_compare`]; keys the candidate has
    /// beyond `params` are ignored. Returns the position of the first match.
    pub fn find(&self, params: &CertInfo) -> Option<usize> {
        self.certs.iter().position(|cert| {
            let candidate = cert.info();
            params.iter().all(|(key, value)| {
                candidate
                    .get(key)
                    .is_some_and(|other| info::value_compare(other, value))
            })
        })
    }

    /// Inserts a certificate before position `index`.
    ///
    /// A certificate without a subject key identifier, or one whose subject
    /// key identifier is already present, is skipped. An index past the end
    /// appends.
    pub fn insert(&mut self, index: usize, cert: Certificate) {
        let skeyid = match cert.subject_key_id() {
            Some(skeyid) => skeyid.to_string(),
            None => {
                warn!(
                    "refusing to add certificate without a subject key identifier: {}",
                    cert.subject_name_string().unwrap_or_default()
                );
                return;
            }
        };

        let mut search = CertInfo::new();
        search.insert(
            info::SUBJECT_KEY_IDENTIFIER.to_string(),
            Value::String(skeyid.clone()),
        );
        if self.find(&search).is_some() {
            debug!("certificate with key id {} already present, skipping", skeyid);
            return;
        }

        let index = index.min(self.certs.len());
        self.certs.insert(index, cert);
    }

    /// Appends a certificate, subject to the same rules as [`insert`](Self::insert).
    pub fn add(&mut self, cert: Certificate) {
        self.insert(self.certs.len(), cert);
    }

    /// Removes and returns the certificate at `index`, or `None` when the
    /// index is out of range.
    pub fn erase(&mut self, index: usize) -> Option<Certificate> {
        if index < self.certs.len() {
            Some(self.certs.remove(index))
        } else {
            None
        }
    }
}

impl Deref for CertificateVector {
    type Target = [Certificate];

    fn deref(&self) -> &Self::Target {
        &self.certs
    }
}

impl DerefMut for CertificateVector {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.certs
    }
}
