//! Digest functions used by XML-DSig reference and signature computation.

use aws_lc_rs::digest;

/// Computes a SHA-256 digest of the input data.
///
/// SHA-256 is the digest the SAML ecosystem expects by default
/// (`http://www.w3.org/2001/04/xmlenc#sha256`).
#[must_use]
pub fn sha256(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA256, data).as_ref().to_vec()
}

/// Computes a SHA-384 digest of the input data.
#[must_use]
pub fn sha384(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA384, data).as_ref().to_vec()
}

/// Computes a SHA-512 digest of the input data.
#[must_use]
pub fn sha512(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA512, data).as_ref().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_produces_correct_length() {
        assert_eq!(sha256(b"test").len(), 32);
    }

    #[test]
    fn sha384_produces_correct_length() {
        assert_eq!(sha384(b"test").len(), 48);
    }

    #[test]
    fn sha512_produces_correct_length() {
        assert_eq!(sha512(b"test").len(), 64);
    }

    #[test]
    fn sha256_is_deterministic() {
        assert_eq!(sha256(b"hello world"), sha256(b"hello world"));
        assert_ne!(sha256(b"hello world"), sha256(b"hello worlds"));
    }
}
