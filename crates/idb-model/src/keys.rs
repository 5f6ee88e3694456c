//! Signing-key metadata and the host key store capability.
//!
//! Key material lives in the host's key store. The engine fetches it
//! fresh on every signing operation so a rotation between two calls can
//! never leave a message half-signed with stale material.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of a realm signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    /// The key currently used for signing.
    Active,
    /// A rotated-out key retained so peers can still verify old
    /// signatures.
    Passive,
}

/// A realm signing key as exposed by the host key store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningKey {
    /// Key identifier (kid).
    pub kid: String,

    /// Lifecycle status.
    pub status: KeyStatus,

    /// Provider priority; among keys of equal status, higher wins.
    pub priority: i64,

    /// X.509 certificate in PEM form. A key without a certificate is
    /// unusable for SAML and is excluded from every output.
    pub certificate_pem: Option<String>,

    /// Public key in DER form (`SubjectPublicKeyInfo`).
    pub public_key_der: Vec<u8>,

    /// Private key in DER form (PKCS#1 or PKCS#8).
    pub private_key_der: Vec<u8>,
}

impl SigningKey {
    /// Returns true if this key can appear in signatures and metadata.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.certificate_pem.is_some()
    }

    /// Returns the certificate body with PEM armor and whitespace
    /// stripped, as embedded in `<ds:X509Certificate>` elements.
    #[must_use]
    pub fn certificate_base64(&self) -> Option<String> {
        let pem = self.certificate_pem.as_deref()?;
        let body: String = pem
            .lines()
            .filter(|line| !line.starts_with("-----"))
            .collect::<Vec<_>>()
            .join("");
        Some(body.chars().filter(|c| !c.is_whitespace()).collect())
    }
}

/// Error type for key store operations.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// The realm has no active signing key.
    #[error("no active signing key for realm: {0}")]
    NoActiveKey(String),

    /// Realm not found.
    #[error("realm not found: {0}")]
    RealmNotFound(String),

    /// Backing store failure.
    #[error("key store error: {0}")]
    Storage(String),
}

/// Read-only access to a realm's signing keys.
///
/// Implementations may be backed by a database, a vault, or an in-memory
/// store. The engine calls these per operation and never caches results.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Returns the realm's currently active signing key.
    async fn active_signing_key(&self, realm: &str) -> Result<SigningKey, KeyStoreError>;

    /// Returns all of the realm's signing keys, active and passive, in
    /// no particular order.
    async fn signing_keys(&self, realm: &str) -> Result<Vec<SigningKey>, KeyStoreError>;
}
