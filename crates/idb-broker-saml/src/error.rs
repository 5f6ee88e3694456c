//! Error types for the SAML SP engine.
//!
//! The taxonomy mirrors how failures are allowed to travel: composition
//! and signing problems surface as a single wrapped error, missing logout
//! correlation is fatal only for front-channel flows, and backchannel
//! transport failures are logged where they happen and never reach a
//! caller as an error.

use thiserror::Error;

/// Result type for SAML engine operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML SP engine errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Building an outgoing authentication request failed. Wraps every
    /// composition or signing failure on the login path; callers surface
    /// a generic broker failure without internal detail.
    #[error("could not create authentication request: {0}")]
    RequestComposition(String),

    /// Logout was attempted without a stored NameID correlation.
    #[error("no federated subject NameID stored for session")]
    MissingCorrelation,

    /// XML signature creation failed.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    /// Composing or signing the SP metadata document failed. Always
    /// propagated; a broken descriptor must not be served.
    #[error("failed to export SP metadata: {0}")]
    MetadataBuild(String),

    /// Invalid provider configuration (bad signing setup, missing key).
    #[error("invalid provider configuration: {0}")]
    Configuration(String),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// Deflate compression or decompression error.
    #[error("deflate error: {0}")]
    Deflate(String),

    /// Malformed XML input.
    #[error("XML error: {0}")]
    Xml(String),

    /// Key store access failed.
    #[error("key store error: {0}")]
    KeyStore(#[from] idb_model::KeyStoreError),

    /// Session note store access failed.
    #[error("session note error: {0}")]
    SessionNotes(#[from] idb_model::SessionNotesError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}

impl From<std::io::Error> for SamlError {
    fn from(err: std::io::Error) -> Self {
        Self::Deflate(err.to_string())
    }
}

impl From<idb_crypto::SignatureError> for SamlError {
    fn from(err: idb_crypto::SignatureError) -> Self {
        Self::SignatureCreation(err.to_string())
    }
}
