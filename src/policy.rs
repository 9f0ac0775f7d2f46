use bon::Builder;
use der::flagset::{FlagSet, flags};
use time::OffsetDateTime;

flags! {
    /// Independently combinable validation checks.
    ///
    /// Flag semantics are resolved per chain position during validation: a
    /// leaf is never required to be a CA, and a CA is never required to carry
    /// TLS server usages, so [`SslKeyUsage`](ValidationPolicy::SslKeyUsage)
    /// applies only at depth zero while the CA flags apply everywhere else.
    pub enum ValidationPolicy: u8 {
        /// The validation time must fall within each certificate's validity
        /// window.
        Time,
        /// The leaf's key usage must permit TLS server authentication.
        SslKeyUsage,
        /// Issuing certificates must be permitted to sign certificates.
        CaKeyUsage,
        /// Issuing certificates must satisfy basic constraints, including
        /// path length.
        CaBasicConstraints,
        /// The leaf's common name must match the requested hostname.
        Hostname,
        /// The chain must be anchored at a store-trusted certificate.
        Trusted,
    }
}

/// A set of [`ValidationPolicy`] flags.
pub type PolicyFlags = FlagSet<ValidationPolicy>;

/// The full policy used for TLS server endpoints: every check enabled.
pub fn ssl_policy() -> PolicyFlags {
    ValidationPolicy::Time
        | ValidationPolicy::SslKeyUsage
        | ValidationPolicy::CaKeyUsage
        | ValidationPolicy::CaBasicConstraints
        | ValidationPolicy::Hostname
        | ValidationPolicy::Trusted
}

/// Caller-supplied inputs to a validation attempt.
///
/// # Fields
/// * `hostname` - The hostname being connected to; required when the policy
///   includes [`ValidationPolicy::Hostname`].
/// * `validation_time` - The instant to check validity windows against;
///   defaults to the current time.
#[derive(Clone, Debug, Default, Builder)]
pub struct ValidationParams {
    pub hostname: Option<String>,
    pub validation_time: Option<OffsetDateTime>,
}
