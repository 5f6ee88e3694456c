//! XML Signature support.
//!
//! XML Digital Signature (XML-DSig) creation for outgoing SAML messages
//! and the SP metadata document. Verification of inbound signatures
//! belongs to the inbound endpoint and is not part of this engine.

mod signer;

pub use signer::*;

use serde::{Deserialize, Serialize};

use crate::types::{canonicalization_algorithms, digest_algorithms, signature_algorithms};

/// Signature algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// RSA with SHA-256 (the interoperability default).
    #[default]
    RsaSha256,
    /// RSA with SHA-384.
    RsaSha384,
    /// RSA with SHA-512.
    RsaSha512,
    /// Legacy RSA with SHA-1 (kept for configuration compatibility;
    /// signing with it is refused).
    RsaSha1,
}

impl SignatureAlgorithm {
    /// Returns the XML-DSig signature method URI.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::RsaSha256 => signature_algorithms::RSA_SHA256,
            Self::RsaSha384 => signature_algorithms::RSA_SHA384,
            Self::RsaSha512 => signature_algorithms::RSA_SHA512,
            Self::RsaSha1 => signature_algorithms::RSA_SHA1,
        }
    }

    /// Returns the corresponding digest method URI.
    #[must_use]
    pub const fn digest_uri(&self) -> &'static str {
        match self {
            Self::RsaSha256 => digest_algorithms::SHA256,
            Self::RsaSha384 => digest_algorithms::SHA384,
            Self::RsaSha512 => digest_algorithms::SHA512,
            Self::RsaSha1 => digest_algorithms::SHA1,
        }
    }

    /// Parses a signature algorithm from its configuration name
    /// (`"RSA_SHA256"` and friends).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "RSA_SHA256" => Some(Self::RsaSha256),
            "RSA_SHA384" => Some(Self::RsaSha384),
            "RSA_SHA512" => Some(Self::RsaSha512),
            "RSA_SHA1" => Some(Self::RsaSha1),
            _ => None,
        }
    }

    /// Parses a signature algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            signature_algorithms::RSA_SHA256 => Some(Self::RsaSha256),
            signature_algorithms::RSA_SHA384 => Some(Self::RsaSha384),
            signature_algorithms::RSA_SHA512 => Some(Self::RsaSha512),
            signature_algorithms::RSA_SHA1 => Some(Self::RsaSha1),
            _ => None,
        }
    }

    /// Returns true if this algorithm uses a deprecated hash (SHA-1).
    #[must_use]
    pub const fn is_deprecated(&self) -> bool {
        matches!(self, Self::RsaSha1)
    }
}

/// Canonicalization algorithm selection.
///
/// SAML message and metadata signing always uses exclusive C14N; the
/// with-comments variant exists only for peers that request it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanonicalizationAlgorithm {
    /// Exclusive C14N without comments.
    #[default]
    ExclusiveC14N,
    /// Exclusive C14N with comments.
    ExclusiveC14NWithComments,
}

impl CanonicalizationAlgorithm {
    /// Returns the URI for this canonicalization algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::ExclusiveC14N => canonicalization_algorithms::EXCLUSIVE_C14N,
            Self::ExclusiveC14NWithComments => {
                canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS
            }
        }
    }
}

/// Configuration for signature creation.
#[derive(Debug, Clone)]
pub struct SignatureConfig {
    /// The signature algorithm to use.
    pub algorithm: SignatureAlgorithm,
    /// The canonicalization algorithm to use.
    pub canonicalization: CanonicalizationAlgorithm,
    /// Whether to include the X.509 certificate in the signature.
    pub include_certificate: bool,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            algorithm: SignatureAlgorithm::RsaSha256,
            canonicalization: CanonicalizationAlgorithm::ExclusiveC14N,
            include_certificate: true,
        }
    }
}

impl SignatureConfig {
    /// Creates a signature configuration with the given algorithm.
    #[must_use]
    pub const fn with_algorithm(algorithm: SignatureAlgorithm) -> Self {
        Self {
            algorithm,
            canonicalization: CanonicalizationAlgorithm::ExclusiveC14N,
            include_certificate: true,
        }
    }
}
