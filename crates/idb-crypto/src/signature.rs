//! RSA signature operations for XML-DSig.
//!
//! Keys are handled in DER form only; PEM decoding happens at the edges
//! (the signer in `idb-broker-saml` accepts PEM and converts).

use aws_lc_rs::{
    rand::SystemRandom,
    signature::{self, RsaKeyPair, UnparsedPublicKey},
};
use thiserror::Error;

/// Error type for signature operations.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Signature verification failed.
    #[error("signature verification failed")]
    Verification,

    /// Invalid key format.
    #[error("invalid key format: {0}")]
    InvalidKey(String),
}

/// RSA PKCS#1 v1.5 signature algorithms used for SAML message signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RsaAlgorithm {
    /// RSA with SHA-256 (the SAML ecosystem default).
    #[default]
    Rs256,
    /// RSA with SHA-384.
    Rs384,
    /// RSA with SHA-512.
    Rs512,
}

impl RsaAlgorithm {
    /// Returns the XML-DSig signature method URI.
    #[must_use]
    pub const fn xml_dsig_uri(self) -> &'static str {
        match self {
            Self::Rs256 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
            Self::Rs384 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384",
            Self::Rs512 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512",
        }
    }
}

/// Signs data with an RSA private key.
///
/// # Arguments
///
/// * `key_der` - RSA private key in DER format (PKCS#1 or PKCS#8)
/// * `data` - Data to sign
/// * `algorithm` - Signature algorithm
///
/// # Errors
///
/// Returns an error if the key cannot be parsed or signing fails.
pub fn rsa_sign(
    key_der: &[u8],
    data: &[u8],
    algorithm: RsaAlgorithm,
) -> Result<Vec<u8>, SignatureError> {
    let key_pair = RsaKeyPair::from_der(key_der)
        .or_else(|_| RsaKeyPair::from_pkcs8(key_der))
        .map_err(|e| SignatureError::InvalidKey(format!("Invalid RSA key: {e}")))?;

    let rng = SystemRandom::new();
    let mut sig = vec![0u8; key_pair.public_modulus_len()];

    let padding = match algorithm {
        RsaAlgorithm::Rs256 => &signature::RSA_PKCS1_SHA256,
        RsaAlgorithm::Rs384 => &signature::RSA_PKCS1_SHA384,
        RsaAlgorithm::Rs512 => &signature::RSA_PKCS1_SHA512,
    };

    key_pair
        .sign(padding, &rng, data, &mut sig)
        .map_err(|e| SignatureError::Signing(format!("RSA signing failed: {e}")))?;

    Ok(sig)
}

/// Verifies an RSA signature.
///
/// # Arguments
///
/// * `public_key_der` - RSA public key in DER format (`SubjectPublicKeyInfo`)
/// * `data` - Original data that was signed
/// * `sig` - Signature to verify
/// * `algorithm` - Signature algorithm
///
/// # Errors
///
/// Returns `Ok(false)` when the signature does not match; an error only
/// when the inputs cannot be processed at all.
pub fn rsa_verify(
    public_key_der: &[u8],
    data: &[u8],
    sig: &[u8],
    algorithm: RsaAlgorithm,
) -> Result<bool, SignatureError> {
    use aws_lc_rs::signature::{
        RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_2048_8192_SHA384, RSA_PKCS1_2048_8192_SHA512,
    };

    let verification_alg: &dyn signature::VerificationAlgorithm = match algorithm {
        RsaAlgorithm::Rs256 => &RSA_PKCS1_2048_8192_SHA256,
        RsaAlgorithm::Rs384 => &RSA_PKCS1_2048_8192_SHA384,
        RsaAlgorithm::Rs512 => &RSA_PKCS1_2048_8192_SHA512,
    };

    let public_key = UnparsedPublicKey::new(verification_alg, public_key_der);

    match public_key.verify(data, sig) {
        Ok(()) => Ok(true),
        Err(_) => Ok(false),
    }
}
