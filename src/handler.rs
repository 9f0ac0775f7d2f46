use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::cert::Certificate;
use crate::chain::CertificateChain;
use crate::error::Result;
use crate::store::CertificateStore;
use crate::vector::CertificateVector;

/// The top-level entry point tying certificates, chains, and the store
/// together.
///
/// The handler owns one merged [`CertificateStore`]: the user-writable bundle
/// loaded first, then the application's shipped bundle folded in so new
/// anchors from updated installs appear without clobbering user additions.
/// The store is shared behind `Arc<Mutex<_>>`; clone the handler (or call
/// [`store`](Self::store)) to share it across connections, and hold the lock
/// for the duration of each validation so concurrent validations cannot
/// interleave cache updates.
#[derive(Clone, Debug)]
pub struct CertificateHandler {
    store: Arc<Mutex<CertificateStore>>,
}

impl CertificateHandler {
    /// Creates a handler from a user store file and an application bundle
    /// file.
    ///
    /// Both paths may point at missing files. Bundled certificates are merged
    /// via `add`, so duplicates of user-store entries are skipped. The merge
    /// is not persisted; call `save` on the store to write the user file.
    pub fn new(user_store_path: impl AsRef<Path>, app_bundle_path: impl AsRef<Path>) -> Self {
        let mut store = CertificateStore::load(user_store_path);
        let app_store = CertificateStore::load(app_bundle_path.as_ref());
        info!(
            "merging {} bundled certificate(s) from {} into store {}",
            app_store.len(),
            app_bundle_path.as_ref().display(),
            store.store_id()
        );
        for cert in app_store.iter() {
            store.add(cert.clone());
        }
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Decodes a certificate from PEM text.
    pub fn certificate(&self, pem: &str) -> Result<Certificate> {
        Certificate::from_pem(pem)
    }

    /// Decodes a certificate from raw DER bytes.
    pub fn certificate_from_der(&self, der: &[u8]) -> Result<Certificate> {
        Certificate::from_der(der)
    }

    /// Orders a leaf certificate and a pool of untrusted intermediates into
    /// a chain.
    pub fn chain(&self, leaf: Certificate, untrusted: CertificateVector) -> CertificateChain {
        CertificateChain::build(leaf, untrusted)
    }

    /// Returns the certificate store for an id.
    ///
    /// A single merged store backs every id today, so any id returns it; the
    /// parameter keeps the signature stable for configurations with more
    /// than one store.
    pub fn store(&self, store_id: &str) -> Arc<Mutex<CertificateStore>> {
        debug!("certificate store {} requested", store_id);
        Arc::clone(&self.store)
    }
}
