//! # idb-crypto
//!
//! Cryptographic operations for the idbroker SAML engine, built on
//! aws-lc-rs.
//!
//! SAML 2.0 interoperability pins the algorithm floor: peer Identity
//! Providers overwhelmingly expect RSA PKCS#1 v1.5 with SHA-256, so that
//! is the default everywhere. SHA-384/SHA-512 variants are available for
//! deployments that negotiate them.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod hash;
pub mod signature;

pub use hash::{sha256, sha384, sha512};
pub use signature::{rsa_sign, rsa_verify, RsaAlgorithm, SignatureError};
