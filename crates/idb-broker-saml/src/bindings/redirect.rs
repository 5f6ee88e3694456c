//! HTTP-Redirect Binding implementation.
//!
//! Outgoing SAML requests are DEFLATE-compressed, base64-encoded and
//! URL-encoded into query parameters. Signing, when required, is a
//! detached signature over the query string rather than an embedded
//! XML-DSig element.

use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::{SamlError, SamlResult};
use crate::types::{RELAY_STATE_PARAM, SAML_REQUEST_PARAM};

/// HTTP-Redirect binding encoder/decoder.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Deflates and base64-encodes a SAML message for Redirect
    /// transport. The result still needs URL-encoding when placed in a
    /// query string.
    pub fn encode(xml: &str) -> SamlResult<String> {
        let compressed = deflate_compress(xml.as_bytes())?;
        Ok(base64::engine::general_purpose::STANDARD.encode(&compressed))
    }

    /// Builds an unsigned redirect URL for a SAML request.
    pub fn request_url(
        encoded: &str,
        destination: &str,
        relay_state: Option<&str>,
    ) -> SamlResult<String> {
        let mut query = format!("{SAML_REQUEST_PARAM}={}", urlencoding::encode(encoded));
        if let Some(rs) = relay_state {
            query.push_str(&format!("&{RELAY_STATE_PARAM}={}", urlencoding::encode(rs)));
        }
        Ok(append_query(destination, &query))
    }

    /// Decodes a SAML request from a full redirect URL.
    pub fn decode_url(url: &str) -> SamlResult<DecodedRedirectMessage> {
        let parsed = url::Url::parse(url)
            .map_err(|e| SamlError::Xml(format!("Invalid URL: {e}")))?;

        let mut saml_request = None;
        let mut relay_state = None;
        let mut signature = None;
        let mut sig_alg = None;

        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "SAMLRequest" => saml_request = Some(value.to_string()),
                "RelayState" => relay_state = Some(value.to_string()),
                "Signature" => signature = Some(value.to_string()),
                "SigAlg" => sig_alg = Some(value.to_string()),
                _ => {}
            }
        }

        let encoded = saml_request
            .ok_or_else(|| SamlError::Xml("No SAMLRequest parameter".to_string()))?;

        let b64_decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| SamlError::Base64Decode(e.to_string()))?;

        let xml_bytes = deflate_decompress(&b64_decoded)?;
        let xml = String::from_utf8(xml_bytes)
            .map_err(|e| SamlError::Xml(format!("Invalid UTF-8 in message: {e}")))?;

        Ok(DecodedRedirectMessage {
            xml,
            relay_state,
            signature,
            sig_alg,
        })
    }
}

/// A SAML request decoded from redirect query parameters.
#[derive(Debug, Clone)]
pub struct DecodedRedirectMessage {
    /// The decoded XML message.
    pub xml: String,
    /// The RelayState if present.
    pub relay_state: Option<String>,
    /// The detached signature if present.
    pub signature: Option<String>,
    /// The signature algorithm URI if present.
    pub sig_alg: Option<String>,
}

/// Appends a query string to a URL, reusing an existing '?' separator.
pub(crate) fn append_query(destination: &str, query: &str) -> String {
    let separator = if destination.contains('?') { '&' } else { '?' };
    format!("{destination}{separator}{query}")
}

/// Compresses data using DEFLATE (raw, no zlib header).
fn deflate_compress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SamlError::Deflate(format!("Compression error: {e}")))?;
    encoder
        .finish()
        .map_err(|e| SamlError::Deflate(format!("Compression finish error: {e}")))
}

/// Decompresses DEFLATE data.
fn deflate_decompress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| SamlError::Deflate(format!("Decompression error: {e}")))?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_and_decode_request() {
        let xml = r#"<samlp:AuthnRequest>test content here</samlp:AuthnRequest>"#;
        let encoded = HttpRedirectBinding::encode(xml).unwrap();
        let url = HttpRedirectBinding::request_url(
            &encoded,
            "https://idp.example.com/sso",
            Some("state123"),
        )
        .unwrap();

        assert!(url.starts_with("https://idp.example.com/sso?"));
        assert!(url.contains("SAMLRequest="));
        assert!(url.contains("RelayState=state123"));

        let decoded = HttpRedirectBinding::decode_url(&url).unwrap();
        assert_eq!(decoded.xml, xml);
        assert_eq!(decoded.relay_state.as_deref(), Some("state123"));
        assert_eq!(decoded.signature, None);
    }

    #[test]
    fn deflate_roundtrip() {
        let original = b"Test data for compression";
        let compressed = deflate_compress(original).unwrap();
        let decompressed = deflate_decompress(&compressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn url_with_existing_query() {
        let encoded = HttpRedirectBinding::encode("<Test/>").unwrap();
        let url = HttpRedirectBinding::request_url(
            &encoded,
            "https://idp.example.com/sso?existing=param",
            None,
        )
        .unwrap();

        assert!(url.contains("?existing=param&SAMLRequest="));
    }

    #[test]
    fn decode_rejects_url_without_message() {
        let result = HttpRedirectBinding::decode_url("https://idp.example.com/sso?RelayState=x");
        assert!(result.is_err());
    }
}
