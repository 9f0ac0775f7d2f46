use std::collections::HashMap;
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Once;

use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::cert::Certificate;
use crate::cert::info::{self, CertInfo};
use crate::chain::CertificateChain;
use crate::error::{Result, TrustKitError};
use crate::hostname::hostname_wildcard_match;
use crate::pki::verify_signature;
use crate::policy::{PolicyFlags, ValidationParams, ValidationPolicy};
use crate::vector::CertificateVector;

static DISABLED_WARNING: Once = Once::new();

/// A persistent collection of trust anchors plus the validated-chain cache.
///
/// The store is an ordered certificate collection (all of
/// [`CertificateVector`]'s operations apply through `Deref`) backed by a PEM
/// bundle file, with two additions: the [`validate`](Self::validate) algorithm
/// that decides whether a presented chain is anchored here, and a cache of
/// subject key ids whose chains have already been proven, keyed to the leaf's
/// validity window so later validations only re-check time.
///
/// Mutations (including the cache insertions performed by successful
/// validations) are never persisted implicitly; call [`save`](Self::save).
#[derive(Debug, Default)]
pub struct CertificateStore {
    certs: CertificateVector,
    cache: HashMap<String, (OffsetDateTime, OffsetDateTime)>,
    path: PathBuf,
    validation_disabled: bool,
}

impl CertificateStore {
    /// Loads a store from a PEM bundle file.
    ///
    /// A missing file yields an empty store. Each PEM block is decoded and
    /// checked against the time policy; blocks that fail either step are
    /// logged and skipped so one bad certificate cannot poison the bundle.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut store = Self {
            path: path.to_path_buf(),
            ..Self::default()
        };

        if !path.exists() {
            info!(
                "certificate store {} does not exist, starting empty",
                path.display()
            );
            return store;
        }

        let contents = match fs::read(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("could not read certificate store {}: {}", path.display(), e);
                return store;
            }
        };
        let blocks = match pem::parse_many(&contents) {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!(
                    "could not parse certificate store {}: {}",
                    path.display(),
                    e
                );
                return store;
            }
        };

        let mut loaded = 0usize;
        let mut rejected = 0usize;
        for block in blocks {
            if block.tag() != "CERTIFICATE" {
                rejected += 1;
                debug!("skipping {} PEM block in {}", block.tag(), path.display());
                continue;
            }
            match Certificate::from_der(block.contents()) {
                Ok(cert) => {
                    match validate_cert(
                        ValidationPolicy::Time.into(),
                        &cert,
                        &ValidationParams::default(),
                        0,
                    ) {
                        Ok(()) => {
                            store.certs.add(cert);
                            loaded += 1;
                        }
                        Err(e) => {
                            rejected += 1;
                            warn!(
                                "rejecting certificate from store {}: {}",
                                path.display(),
                                e
                            );
                        }
                    }
                }
                Err(e) => {
                    rejected += 1;
                    warn!(
                        "could not decode certificate block in {}: {}",
                        path.display(),
                        e
                    );
                }
            }
        }
        info!(
            "loaded {} certificate(s) from {} ({} rejected)",
            loaded,
            path.display(),
            rejected
        );
        store
    }

    /// Writes the store back to its backing file, one PEM block per
    /// certificate.
    pub fn save(&self) -> Result<()> {
        let mut contents = String::new();
        for cert in self.certs.iter() {
            match cert.to_pem() {
                Ok(pem) if !pem.is_empty() => {
                    contents.push_str(&pem);
                    contents.push('\n');
                }
                Ok(_) => {}
                Err(e) => warn!(
                    "could not re-encode certificate for store {}: {}",
                    self.path.display(),
                    e
                ),
            }
        }
        fs::write(&self.path, contents)?;
        Ok(())
    }

    /// An identifier for this store, derived from its backing file name.
    pub fn store_id(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Whether validation is currently disabled store-wide.
    pub fn validation_disabled(&self) -> bool {
        self.validation_disabled
    }

    /// Disables or re-enables all validation.
    ///
    /// While disabled, [`validate`](Self::validate) accepts every chain
    /// without inspecting anything. This exists for debugging against broken
    /// endpoints and must never be a production default.
    pub fn set_validation_disabled(&mut self, disabled: bool) {
        if disabled {
            warn!("certificate validation has been disabled; every chain will be accepted");
        }
        self.validation_disabled = disabled;
    }

    /// Validates a certificate chain against this store under the given
    /// policy.
    ///
    /// The checks run in a fixed order: the hostname check first (always,
    /// even when the outcome would later be served from the cache), then the
    /// validated-chain cache keyed by the leaf's subject key id, then a walk
    /// out from the leaf. At each chain position the per-certificate checks
    /// run with the flags that apply at that depth, the link signature is
    /// verified against the certificate above, and the store is searched for
    /// either the certificate itself or its issuer. Finding one anchors the
    /// chain: the leaf's key id and validity window enter the cache and the
    /// walk stops without visiting the remaining positions.
    ///
    /// A chain that exhausts without an anchor fails with `UntrustedChain`
    /// when [`ValidationPolicy::Trusted`] is set; without it the chain is
    /// accepted and the leaf is recorded via
    /// [`cache_untrusted`](Self::cache_untrusted).
    ///
    /// # Arguments
    /// * `policy` - The set of checks to apply.
    /// * `chain` - The chain under test, leaf first.
    /// * `params` - Hostname and validation time inputs.
    pub fn validate(
        &mut self,
        policy: PolicyFlags,
        chain: &CertificateChain,
        params: &ValidationParams,
    ) -> Result<()> {
        if self.validation_disabled {
            DISABLED_WARNING.call_once(|| {
                warn!("certificate validation is disabled; accepting chain without inspection");
            });
            return Ok(());
        }

        if chain.is_empty() {
            return Err(TrustKitError::InvalidCertificate {
                reason: "no certificates in chain".to_string(),
                info: CertInfo::new(),
            });
        }
        let leaf = &chain[0];

        // The hostname check runs before the cache lookup: a cache hit must
        // not bypass hostname enforcement, since cache entries are keyed by
        // subject key id alone.
        if policy.contains(ValidationPolicy::Hostname) {
            let hostname =
                params
                    .hostname
                    .as_deref()
                    .ok_or_else(|| TrustKitError::InvalidCertificate {
                        reason: "hostname check requested but no hostname supplied".to_string(),
                        info: leaf.info().clone(),
                    })?;
            let common_name =
                leaf.common_name()
                    .ok_or_else(|| TrustKitError::InvalidCertificate {
                        reason: "certificate subject has no common name".to_string(),
                        info: leaf.info().clone(),
                    })?;
            debug!(
                "validating hostname {} against common name {}",
                hostname, common_name
            );
            if !hostname_wildcard_match(hostname, common_name) {
                return Err(TrustKitError::HostnameMismatch {
                    hostname: hostname.to_string(),
                    info: leaf.info().clone(),
                });
            }
        }

        let skeyid = match leaf.subject_key_id() {
            Some(skeyid) => skeyid.to_string(),
            None => {
                return Err(TrustKitError::MalformedCertificate {
                    property: info::SUBJECT_KEY_IDENTIFIER.to_string(),
                    info: leaf.info().clone(),
                });
            }
        };
        let window = (leaf.not_before(), leaf.not_after());

        if let Some((from, to)) = self.cache.get(&skeyid) {
            debug!("certificate {} found in the validated-chain cache", skeyid);
            if policy.contains(ValidationPolicy::Time) {
                let validation_time = params
                    .validation_time
                    .unwrap_or_else(OffsetDateTime::now_utc);
                if validation_time < *from || validation_time > *to {
                    return Err(TrustKitError::ExpiredOrNotYetValid {
                        validation_time,
                        info: leaf.info().clone(),
                    });
                }
            }
            return Ok(());
        }

        let mut previous: Option<&Certificate> = None;
        for (depth, cert) in chain.iter().enumerate() {
            let mut local_policy = policy;
            match previous {
                None => {
                    // The leaf need not be a CA.
                    local_policy &=
                        !(ValidationPolicy::CaKeyUsage | ValidationPolicy::CaBasicConstraints);
                }
                Some(child) => {
                    // Issuing certificates need not carry TLS server usages,
                    // but must have signed the certificate below them.
                    local_policy &= !PolicyFlags::from(ValidationPolicy::SslKeyUsage);
                    if !verify_signature(cert, child) {
                        return Err(TrustKitError::InvalidSignature {
                            info: child.info().clone(),
                        });
                    }
                }
            }

            validate_cert(local_policy, cert, params, depth)?;

            // Directly trusted: the certificate itself is in the store.
            if let Some(cert_skeyid) = cert.subject_key_id() {
                let mut search = CertInfo::new();
                search.insert(
                    info::SUBJECT_KEY_IDENTIFIER.to_string(),
                    Value::String(cert_skeyid.to_string()),
                );
                if self.certs.find(&search).is_some() {
                    debug!(
                        "chain anchored at store certificate {} (depth {})",
                        cert_skeyid, depth
                    );
                    self.cache.insert(skeyid, window);
                    return Ok(());
                }
            }

            // Or the store holds its issuer.
            if let Some(found) = self.find_issuer(cert) {
                validate_cert(
                    policy & PolicyFlags::from(ValidationPolicy::CaBasicConstraints),
                    &found,
                    &ValidationParams::default(),
                    depth,
                )?;
                if !verify_signature(&found, cert) {
                    return Err(TrustKitError::InvalidSignature {
                        info: cert.info().clone(),
                    });
                }
                debug!(
                    "chain anchored below store certificate {} (depth {})",
                    found.subject_key_id().unwrap_or_default(),
                    depth
                );
                self.cache.insert(skeyid, window);
                return Ok(());
            }

            previous = Some(cert);
        }

        if policy.contains(ValidationPolicy::Trusted) {
            let last = &chain[chain.len() - 1];
            return Err(TrustKitError::UntrustedChain {
                info: last.info().clone(),
            });
        }

        self.cache_untrusted(leaf);
        Ok(())
    }

    /// Records a certificate as accepted despite having no chain to any
    /// anchor in this store.
    ///
    /// This is the trust-on-first-use knob: the certificate's subject key id
    /// enters the validated-chain cache with its validity window, so later
    /// validations of the same leaf short-circuit. [`validate`](Self::validate)
    /// calls this itself when run without [`ValidationPolicy::Trusted`];
    /// callers wanting an explicit user-approved override can call it
    /// directly.
    pub fn cache_untrusted(&mut self, cert: &Certificate) {
        let skeyid = match cert.subject_key_id() {
            Some(skeyid) => skeyid.to_string(),
            None => return,
        };
        debug!(
            "caching certificate {} without a chain to any anchor",
            skeyid
        );
        self.cache
            .insert(skeyid, (cert.not_before(), cert.not_after()));
    }

    /// Searches the store for the issuer of `cert`, by issuer name plus the
    /// authority key id and serial when the certificate carries them.
    fn find_issuer(&self, cert: &Certificate) -> Option<Certificate> {
        let cert_info = cert.info();
        let mut search = CertInfo::new();
        search.insert(
            info::SUBJECT_NAME_STRING.to_string(),
            cert_info.get(info::ISSUER_NAME_STRING)?.clone(),
        );
        if let Some(Value::Object(akid)) = cert_info.get(info::AUTHORITY_KEY_IDENTIFIER) {
            if let Some(key_id) = akid.get(info::AUTHORITY_KEY_ID) {
                search.insert(info::SUBJECT_KEY_IDENTIFIER.to_string(), key_id.clone());
            }
            if let Some(serial) = akid.get(info::AUTHORITY_KEY_SERIAL) {
                search.insert(info::SERIAL_NUMBER.to_string(), serial.clone());
            }
        }
        self.certs
            .find(&search)
            .map(|index| self.certs[index].clone())
    }
}

impl Deref for CertificateStore {
    type Target = CertificateVector;

    fn deref(&self) -> &Self::Target {
        &self.certs
    }
}

impl DerefMut for CertificateStore {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.certs
    }
}

/// Runs the per-certificate checks for one chain position.
///
/// The presence of subject name, issuer name, validity window, and subject
/// key id is required unconditionally; everything else is governed by
/// `policy`. Key usage and extended key usage are only enforced when the
/// certificate carries the extension, and basic constraints likewise: a
/// certificate without the extension passes the CA checks. A path length
/// constraint is enforced only when nonzero, against the current chain
/// depth.
fn validate_cert(
    policy: PolicyFlags,
    cert: &Certificate,
    params: &ValidationParams,
    depth: usize,
) -> Result<()> {
    let cert_info = cert.info();

    for property in [
        info::SUBJECT_NAME,
        info::SUBJECT_NAME_STRING,
        info::ISSUER_NAME_STRING,
        info::VALID_FROM,
        info::VALID_TO,
        info::SUBJECT_KEY_IDENTIFIER,
    ] {
        if !cert_info.contains_key(property) {
            return Err(TrustKitError::MalformedCertificate {
                property: property.to_string(),
                info: cert_info.clone(),
            });
        }
    }

    if policy.contains(ValidationPolicy::Time) {
        let validation_time = params
            .validation_time
            .unwrap_or_else(OffsetDateTime::now_utc);
        if validation_time < cert.not_before() || validation_time > cert.not_after() {
            return Err(TrustKitError::ExpiredOrNotYetValid {
                validation_time,
                info: cert_info.clone(),
            });
        }
    }

    if policy.contains(ValidationPolicy::SslKeyUsage) {
        if let Some(Value::Array(usage)) = cert_info.get(info::KEY_USAGE) {
            let digital_signature = Value::String(info::KU_DIGITAL_SIGNATURE.to_string());
            let key_encipherment = Value::String(info::KU_KEY_ENCIPHERMENT.to_string());
            if !info::array_includes_value(usage, &digital_signature)
                || !info::array_includes_value(usage, &key_encipherment)
            {
                return Err(TrustKitError::KeyUsageViolation {
                    info: cert_info.clone(),
                });
            }
        }
        if let Some(Value::Array(extended)) = cert_info.get(info::EXTENDED_KEY_USAGE) {
            let server_auth = Value::String(info::EKU_SERVER_AUTH.to_string());
            if !info::array_includes_value(extended, &server_auth) {
                return Err(TrustKitError::KeyUsageViolation {
                    info: cert_info.clone(),
                });
            }
        }
    }

    if policy.contains(ValidationPolicy::CaKeyUsage) {
        if let Some(Value::Array(usage)) = cert_info.get(info::KEY_USAGE) {
            let key_cert_sign = Value::String(info::KU_KEY_CERT_SIGN.to_string());
            if !info::array_includes_value(usage, &key_cert_sign) {
                return Err(TrustKitError::KeyUsageViolation {
                    info: cert_info.clone(),
                });
            }
        }
    }

    if policy.contains(ValidationPolicy::CaBasicConstraints) {
        if let Some(Value::Object(constraints)) = cert_info.get(info::BASIC_CONSTRAINTS) {
            let is_ca = constraints
                .get(info::BASIC_CONSTRAINTS_CA)
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !is_ca {
                return Err(TrustKitError::BasicConstraintsViolation {
                    info: cert_info.clone(),
                });
            }
            if let Some(path_length) = constraints
                .get(info::BASIC_CONSTRAINTS_PATH_LENGTH)
                .and_then(Value::as_i64)
            {
                if path_length != 0 && depth as i64 > path_length {
                    return Err(TrustKitError::BasicConstraintsViolation {
                        info: cert_info.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}
