mod util;

use serde_json::Value;
use time::macros::datetime;

use trustkit::cert::Certificate;
use trustkit::cert::extensions::{FlagSet, KeyUsages};
use trustkit::cert::info;
use trustkit::chain::CertificateChain;
use trustkit::error::TrustKitError;
use trustkit::policy::{PolicyFlags, ValidationParams, ValidationPolicy, ssl_policy};
use trustkit::store::CertificateStore;
use trustkit::vector::CertificateVector;

use const_oid::db::rfc5912::ID_KP_CLIENT_AUTH;

fn store_with(certs: &[&Certificate]) -> CertificateStore {
    let mut store = CertificateStore::default();
    for cert in certs {
        store.add((*cert).clone());
    }
    store
}

fn chain_of(leaf: &Certificate, pool: &[&Certificate]) -> CertificateChain {
    let mut untrusted = CertificateVector::new();
    for cert in pool {
        untrusted.add((*cert).clone());
    }
    CertificateChain::build(leaf.clone(), untrusted)
}

fn hostname_params(hostname: &str) -> ValidationParams {
    ValidationParams::builder()
        .hostname(hostname.to_string())
        .build()
}

/// A leaf that is itself in the store is trusted directly.
#[test]
fn anchors_directly_trusted_leaf() {
    let root = util::root_ca("Test Root CA");
    let server = util::server_cert("server.example.com", &root);

    let mut store = store_with(&[&server.cert]);
    let chain = chain_of(&server.cert, &[]);

    store
        .validate(ssl_policy(), &chain, &hostname_params("server.example.com"))
        .unwrap();
}

/// A leaf whose issuer is in the store is trusted through one signature
/// check.
#[test]
fn anchors_at_stored_issuer() {
    let root = util::root_ca("Test Root CA");
    let server = util::server_cert("server.example.com", &root);

    let mut store = store_with(&[&root.cert]);
    let chain = chain_of(&server.cert, &[]);

    store
        .validate(ssl_policy(), &chain, &hostname_params("server.example.com"))
        .unwrap();
}

/// A three-deep presented chain anchors at the stored root.
#[test]
fn anchors_through_intermediate() {
    let root = util::root_ca("Test Root CA");
    let intermediate = util::intermediate_ca("Test Intermediate CA", &root);
    let server = util::server_cert("server.example.com", &intermediate);

    let mut store = store_with(&[&root.cert]);
    let chain = chain_of(&server.cert, &[&intermediate.cert]);
    assert_eq!(chain.len(), 2);

    store
        .validate(ssl_policy(), &chain, &hostname_params("server.example.com"))
        .unwrap();
}

/// An expired certificate fails under the time policy and passes without it.
#[test]
fn time_policy_governs_expiry() {
    let root = util::root_ca("Test Root CA");
    let expired = util::issue(
        &util::CertParams::builder()
            .common_name("old.example.com")
            .server(true)
            .not_before(datetime!(2026-01-01 00:00:00 UTC))
            .not_after(datetime!(2026-02-01 00:00:00 UTC))
            .build(),
        Some(&root),
    );

    let mut store = store_with(&[&root.cert]);
    let chain = chain_of(&expired.cert, &[]);
    let after_expiry = datetime!(2026-06-01 00:00:00 UTC);
    let params = ValidationParams::builder()
        .validation_time(after_expiry)
        .build();

    match store.validate(
        ValidationPolicy::Time | ValidationPolicy::Trusted,
        &chain,
        &params,
    ) {
        Err(TrustKitError::ExpiredOrNotYetValid {
            validation_time, ..
        }) => assert_eq!(validation_time, after_expiry),
        other => panic!("expected ExpiredOrNotYetValid, got {other:?}"),
    }

    store
        .validate(ValidationPolicy::Trusted.into(), &chain, &params)
        .unwrap();
}

/// The hostname policy compares the hostname against the leaf common name.
#[test]
fn hostname_policy_through_validate() {
    let root = util::root_ca("Test Root CA");
    let server = util::server_cert("server.example.com", &root);

    let mut store = store_with(&[&root.cert]);
    let chain = chain_of(&server.cert, &[]);

    store
        .validate(ssl_policy(), &chain, &hostname_params("server.example.com"))
        .unwrap();

    match store.validate(ssl_policy(), &chain, &hostname_params("other.example.com")) {
        Err(TrustKitError::HostnameMismatch { hostname, .. }) => {
            assert_eq!(hostname, "other.example.com")
        }
        other => panic!("expected HostnameMismatch, got {other:?}"),
    }

    // Requesting the hostname check without supplying a hostname is an error.
    match store.validate(ssl_policy(), &chain, &ValidationParams::default()) {
        Err(TrustKitError::InvalidCertificate { .. }) => {}
        other => panic!("expected InvalidCertificate, got {other:?}"),
    }
}

/// A cached leaf revalidates for a different hostname without consulting the
/// rest of the chain, while the hostname check itself still runs first.
#[test]
fn cache_short_circuits_after_success() {
    let root = util::root_ca("Test Root CA");
    let server = util::server_cert("*.example.com", &root);

    let mut store = store_with(&[&root.cert]);
    let chain = chain_of(&server.cert, &[]);
    store
        .validate(ssl_policy(), &chain, &hostname_params("foo.example.com"))
        .unwrap();

    // Same leaf key id, broken signature: only a cache hit can accept this.
    let tampered = util::tamper_signature(&server.cert);
    let tampered_chain = chain_of(&tampered, &[]);
    store
        .validate(
            ssl_policy(),
            &tampered_chain,
            &hostname_params("bar.example.com"),
        )
        .unwrap();

    // The hostname check still runs before the cache lookup.
    match store.validate(
        ssl_policy(),
        &tampered_chain,
        &hostname_params("bar.other.net"),
    ) {
        Err(TrustKitError::HostnameMismatch { .. }) => {}
        other => panic!("expected HostnameMismatch, got {other:?}"),
    }
}

/// Cache hits still re-check the validity window, without evicting the
/// entry.
#[test]
fn cache_rechecks_time_window() {
    let root = util::root_ca("Test Root CA");
    let pinned = util::issue(
        &util::CertParams::builder()
            .common_name("pinned.example.com")
            .server(true)
            .not_before(datetime!(2026-01-01 00:00:00 UTC))
            .not_after(datetime!(2027-01-01 00:00:00 UTC))
            .build(),
        Some(&root),
    );

    let mut store = store_with(&[&root.cert]);
    let chain = chain_of(&pinned.cert, &[]);
    let inside = ValidationParams::builder()
        .hostname("pinned.example.com".to_string())
        .validation_time(datetime!(2026-06-01 00:00:00 UTC))
        .build();
    let outside = ValidationParams::builder()
        .hostname("pinned.example.com".to_string())
        .validation_time(datetime!(2027-06-01 00:00:00 UTC))
        .build();

    store.validate(ssl_policy(), &chain, &inside).unwrap();

    match store.validate(ssl_policy(), &chain, &outside) {
        Err(TrustKitError::ExpiredOrNotYetValid { .. }) => {}
        other => panic!("expected ExpiredOrNotYetValid, got {other:?}"),
    }

    // The expired lookup did not evict the entry: a tampered copy still
    // passes inside the window.
    let tampered_chain = chain_of(&util::tamper_signature(&pinned.cert), &[]);
    store.validate(ssl_policy(), &tampered_chain, &inside).unwrap();
}

/// A chain that reaches no anchor fails under the trusted policy, naming the
/// topmost certificate.
#[test]
fn untrusted_chain_names_topmost() {
    let root = util::root_ca("Test Root CA");
    let intermediate = util::intermediate_ca("Test Intermediate CA", &root);
    let server = util::server_cert("server.example.com", &intermediate);

    // The store does not contain this hierarchy at all.
    let mut store = CertificateStore::default();
    let chain = chain_of(&server.cert, &[&intermediate.cert]);

    match store.validate(
        ValidationPolicy::Time | ValidationPolicy::Trusted,
        &chain,
        &ValidationParams::default(),
    ) {
        Err(TrustKitError::UntrustedChain { info: topmost }) => assert_eq!(
            topmost.get(info::SUBJECT_NAME_STRING).and_then(Value::as_str),
            intermediate.cert.subject_name_string()
        ),
        other => panic!("expected UntrustedChain, got {other:?}"),
    }
}

/// Without the trusted policy an unanchored leaf is accepted and cached.
#[test]
fn untrusted_leaf_accepted_without_trusted_policy() {
    let lone = util::issue(
        &util::CertParams::builder()
            .common_name("lone.example.com")
            .server(true)
            .build(),
        None,
    );

    let mut store = CertificateStore::default();
    let chain = chain_of(&lone.cert, &[]);
    let params = hostname_params("lone.example.com");

    let mut policy = ssl_policy();
    policy &= !PolicyFlags::from(ValidationPolicy::Trusted);
    store.validate(policy, &chain, &params).unwrap();

    // The acceptance was cached, so even a trusted validation now passes.
    store.validate(ssl_policy(), &chain, &params).unwrap();
}

/// A broken link signature inside the presented chain is rejected.
#[test]
fn invalid_signature_between_links() {
    let root = util::root_ca("Test Root CA");
    let intermediate = util::intermediate_ca("Test Intermediate CA", &root);
    let server = util::server_cert("server.example.com", &intermediate);

    let mut store = store_with(&[&root.cert]);
    let tampered = util::tamper_signature(&server.cert);
    let chain = chain_of(&tampered, &[&intermediate.cert]);

    match store.validate(
        ValidationPolicy::Time | ValidationPolicy::Trusted,
        &chain,
        &ValidationParams::default(),
    ) {
        Err(TrustKitError::InvalidSignature { info: failed }) => assert_eq!(
            failed.get(info::SUBJECT_NAME_STRING).and_then(Value::as_str),
            server.cert.subject_name_string()
        ),
        other => panic!("expected InvalidSignature, got {other:?}"),
    }
}

/// A leaf claiming a stored issuer it was not signed by is rejected.
#[test]
fn invalid_signature_against_store_candidate() {
    let root = util::root_ca("Test Root CA");
    let evil = util::root_ca("Evil CA");

    // Same name and key id as the real root, wrong private key.
    let forged_authority = util::CertificateWithKey {
        cert: root.cert.clone(),
        key: evil.key,
    };
    let forged = util::server_cert("server.example.com", &forged_authority);

    let mut store = store_with(&[&root.cert]);
    let chain = chain_of(&forged.cert, &[]);

    match store.validate(
        ValidationPolicy::Time | ValidationPolicy::Trusted,
        &chain,
        &ValidationParams::default(),
    ) {
        Err(TrustKitError::InvalidSignature { .. }) => {}
        other => panic!("expected InvalidSignature, got {other:?}"),
    }
}

/// The authority key id narrows the issuer search among same-named roots.
#[test]
fn issuer_search_disambiguates_by_key_id() {
    let root_a = util::root_ca("Shared CA");
    let root_b = util::root_ca("Shared CA");
    let server = util::server_cert("server.example.com", &root_b);

    // Both roots carry the same subject name; only the key id tells them
    // apart, and the wrong one comes first.
    let mut store = store_with(&[&root_a.cert, &root_b.cert]);
    assert_eq!(store.len(), 2);

    let chain = chain_of(&server.cert, &[]);
    store
        .validate(ssl_policy(), &chain, &hostname_params("server.example.com"))
        .unwrap();
}

/// The TLS key usage checks reject leaves missing the required usages.
#[test]
fn ssl_key_usage_violations() {
    let root = util::root_ca("Test Root CA");
    let mut store = store_with(&[&root.cert]);
    let policy = PolicyFlags::from(ValidationPolicy::SslKeyUsage);

    // Key usage present without keyEncipherment.
    let missing_ke = util::issue(
        &util::CertParams::builder()
            .common_name("weak.example.com")
            .key_usage(FlagSet::from(KeyUsages::DigitalSignature))
            .build(),
        Some(&root),
    );
    match store.validate(
        policy,
        &chain_of(&missing_ke.cert, &[]),
        &ValidationParams::default(),
    ) {
        Err(TrustKitError::KeyUsageViolation { .. }) => {}
        other => panic!("expected KeyUsageViolation, got {other:?}"),
    }

    // Extended key usage present without serverAuth.
    let client_only = util::issue(
        &util::CertParams::builder()
            .common_name("client.example.com")
            .key_usage(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment)
            .extended_key_usage(vec![ID_KP_CLIENT_AUTH])
            .build(),
        Some(&root),
    );
    match store.validate(
        policy,
        &chain_of(&client_only.cert, &[]),
        &ValidationParams::default(),
    ) {
        Err(TrustKitError::KeyUsageViolation { .. }) => {}
        other => panic!("expected KeyUsageViolation, got {other:?}"),
    }

    // Without either extension the checks do not apply.
    let plain = util::issue(
        &util::CertParams::builder()
            .common_name("plain.example.com")
            .build(),
        Some(&root),
    );
    store
        .validate(
            policy | ValidationPolicy::Trusted,
            &chain_of(&plain.cert, &[]),
            &ValidationParams::default(),
        )
        .unwrap();
}

/// An issuing certificate that cannot sign certificates is rejected.
#[test]
fn ca_key_usage_violation() {
    let root = util::root_ca("Test Root CA");
    let feeble = util::issue(
        &util::CertParams::builder()
            .common_name("Feeble CA")
            .is_ca(true)
            .key_usage(FlagSet::from(KeyUsages::DigitalSignature))
            .build(),
        Some(&root),
    );
    let server = util::server_cert("server.example.com", &feeble);

    let mut store = store_with(&[&root.cert]);
    let chain = chain_of(&server.cert, &[&feeble.cert]);

    match store.validate(
        ValidationPolicy::CaKeyUsage | ValidationPolicy::Trusted,
        &chain,
        &ValidationParams::default(),
    ) {
        Err(TrustKitError::KeyUsageViolation { .. }) => {}
        other => panic!("expected KeyUsageViolation, got {other:?}"),
    }
}

/// An issuing certificate whose basic constraints deny CA status is
/// rejected, while one without the extension is tolerated.
#[test]
fn ca_basic_constraints_violation() {
    let root = util::root_ca("Test Root CA");
    let policy = ValidationPolicy::CaBasicConstraints | ValidationPolicy::Trusted;

    let not_a_ca = util::issue(
        &util::CertParams::builder()
            .common_name("Not A CA")
            .path_length(0)
            .build(),
        Some(&root),
    );
    let server = util::server_cert("server.example.com", &not_a_ca);

    let mut store = store_with(&[&root.cert]);
    let chain = chain_of(&server.cert, &[&not_a_ca.cert]);
    match store.validate(policy, &chain, &ValidationParams::default()) {
        Err(TrustKitError::BasicConstraintsViolation { .. }) => {}
        other => panic!("expected BasicConstraintsViolation, got {other:?}"),
    }

    // A pre-v3 style CA without the extension passes the same check.
    let legacy = util::issue(
        &util::CertParams::builder()
            .common_name("Legacy CA")
            .key_usage(KeyUsages::KeyCertSign | KeyUsages::CRLSign)
            .build(),
        Some(&root),
    );
    let legacy_server = util::server_cert("legacy.example.com", &legacy);
    let chain = chain_of(&legacy_server.cert, &[&legacy.cert]);
    store
        .validate(policy, &chain, &ValidationParams::default())
        .unwrap();
}

/// A nonzero path length on the stored root bounds how deep a chain may
/// grow.
#[test]
fn path_length_bounds_chain_depth() {
    let limited_root = util::issue(
        &util::CertParams::builder()
            .common_name("Limited Root")
            .is_ca(true)
            .path_length(1)
            .build(),
        None,
    );
    let branch = util::intermediate_ca("Branch CA", &limited_root);
    let policy =
        ValidationPolicy::CaBasicConstraints | ValidationPolicy::SslKeyUsage | ValidationPolicy::Trusted;

    let mut store = store_with(&[&limited_root.cert]);

    // Root found at depth 1: within the limit.
    let near = util::server_cert("ok.example.com", &branch);
    let chain = chain_of(&near.cert, &[&branch.cert]);
    store
        .validate(policy, &chain, &ValidationParams::default())
        .unwrap();

    // One more intermediate pushes the root to depth 2: exceeded.
    let deep_ca = util::intermediate_ca("Deep CA", &branch);
    let far = util::server_cert("deep.example.com", &deep_ca);
    let chain = chain_of(&far.cert, &[&deep_ca.cert, &branch.cert]);
    match store.validate(policy, &chain, &ValidationParams::default()) {
        Err(TrustKitError::BasicConstraintsViolation { .. }) => {}
        other => panic!("expected BasicConstraintsViolation, got {other:?}"),
    }
}

/// The insecure override accepts everything without inspection.
#[test]
fn disabled_validation_accepts_everything() {
    let lone = util::issue(
        &util::CertParams::builder()
            .common_name("lone.example.com")
            .build(),
        None,
    );

    let mut store = CertificateStore::default();
    assert!(!store.validation_disabled());
    store.set_validation_disabled(true);
    assert!(store.validation_disabled());

    let chain = chain_of(&lone.cert, &[]);
    store
        .validate(ssl_policy(), &chain, &ValidationParams::default())
        .unwrap();
}

/// An empty chain is rejected outright.
#[test]
fn empty_chain_is_invalid() {
    let bare = util::issue(
        &util::CertParams::builder()
            .common_name("bare.example.com")
            .omit_subject_key_id(true)
            .build(),
        None,
    );

    // A leaf without a subject key id cannot enter a chain.
    let chain = CertificateChain::build(bare.cert, CertificateVector::new());
    assert!(chain.is_empty());

    let mut store = CertificateStore::default();
    match store.validate(ssl_policy(), &chain, &ValidationParams::default()) {
        Err(TrustKitError::InvalidCertificate { .. }) => {}
        other => panic!("expected InvalidCertificate, got {other:?}"),
    }
}
