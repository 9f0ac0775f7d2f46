//! # TrustKit - A Pure Rust Certificate Trust Library
//!
//! TrustKit is a certificate trust and validation library built entirely with
//! rustcrypto libraries, with no dependencies on ring or openssl. It decodes
//! X.509 certificates into inspectable property maps, assembles the
//! certificates presented during a handshake into issuer-ordered chains,
//! validates those chains against application-managed trust stores, and
//! caches validated chains so repeat connections only re-check time validity.
//!
//! ## Supported Signature Algorithms
//!
//! Chain-link signatures are verified for:
//! - **RSA**: PKCS#1 v1.5 with SHA-256, SHA-384, and SHA-512
//! - **ECDSA**: P-256, P-384, and P-521 curves
//! - **Ed25519**: Edwards curve digital signature algorithm
//!
//! ## Key Features
//!
//! - **Pure Rust**: Built entirely with rustcrypto libraries
//! - **Trust Stores**: PEM bundle files with tolerant loading and explicit
//!   persistence
//! - **Chain Validation**: Time, key usage, basic constraints, hostname, and
//!   trust anchoring, each individually selectable
//! - **Validated-Chain Cache**: Proven chains are remembered by subject key
//!   id so later validations short-circuit
//! - **Hostname Wildcards**: Label-wise `*` matching for TLS server names
//! - **Property Maps**: Every certificate exposes a structured map of its
//!   names, validity window, key ids, and usage extensions
//!
//! ## Quick Start
//!
//! ### Validating a Server Chain
//!
//! ```rust,no_run
//! use trustkit::handler::CertificateHandler;
//! use trustkit::policy::{ValidationParams, ssl_policy};
//! use trustkit::vector::CertificateVector;
//!
//! # fn main() -> Result<(), trustkit::error::TrustKitError> {
//! // The user-writable store plus the bundle shipped with the application.
//! let handler = CertificateHandler::new("CA.pem", "ca-bundle.crt");
//!
//! // The certificates presented by the peer.
//! let leaf = handler.certificate(&std::fs::read_to_string("server.pem")?)?;
//! let mut untrusted = CertificateVector::new();
//! untrusted.add(handler.certificate(&std::fs::read_to_string("intermediate.pem")?)?);
//!
//! let chain = handler.chain(leaf, untrusted);
//!
//! let params = ValidationParams::builder()
//!     .hostname("server.example.com".to_string())
//!     .build();
//!
//! let store = handler.store("");
//! store.lock().unwrap().validate(ssl_policy(), &chain, &params)?;
//! println!("chain validated");
//! # Ok(())
//! # }
//! ```
//!
//! ### Inspecting a Certificate
//!
//! ```rust,no_run
//! use trustkit::cert::Certificate;
//!
//! # fn main() -> Result<(), trustkit::error::TrustKitError> {
//! let cert = Certificate::from_pem(&std::fs::read_to_string("server.pem")?)?;
//!
//! println!("subject: {}", cert.subject_name_string().unwrap_or("<none>"));
//! println!("expires: {}", cert.not_after());
//! for (key, value) in cert.info() {
//!     println!("{}: {}", key, value);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every validation failure carries the offending certificate's property map
//! so callers can show users what was actually rejected:
//!
//! ```rust
//! use trustkit::cert::Certificate;
//! use trustkit::error::TrustKitError;
//!
//! match Certificate::from_pem("not a certificate") {
//!     Ok(_) => println!("decoded"),
//!     Err(TrustKitError::InvalidCertificate { reason, .. }) => {
//!         println!("rejected: {}", reason)
//!     }
//!     Err(e) => println!("other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`cert`]: Certificate decoding, property extraction, and re-encoding
//! - [`vector`]: Ordered certificate collections with key-id deduplication
//! - [`chain`]: Issuer-ordered chain assembly from handshake pools
//! - [`policy`]: Validation policy flags and caller-supplied parameters
//! - [`hostname`]: TLS hostname wildcard matching
//! - [`store`]: Persistent trust stores and the validation algorithm
//! - [`pki`]: Chain-link signature verification
//! - [`handler`]: Top-level composition of decoding, chains, and the store
//! - [`error`]: Comprehensive error types and handling

pub mod cert;
pub mod chain;
pub mod error;
pub mod handler;
pub mod hostname;
pub mod pki;
pub mod policy;
pub mod store;
pub mod vector;
