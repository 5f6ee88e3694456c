//! HTTP-POST Binding implementation.
//!
//! Outgoing SAML requests are base64-encoded and delivered through an
//! auto-submitting HTML form. The same encoded value doubles as the
//! `SAMLRequest` form field of backchannel logout POSTs.

use base64::Engine;

use crate::error::{SamlError, SamlResult};
use crate::types::{RELAY_STATE_PARAM, SAML_REQUEST_PARAM};

/// HTTP-POST binding encoder/decoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Base64-encodes a SAML message for POST transport.
    #[must_use]
    pub fn encode(xml: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(xml)
    }

    /// Builds the auto-submitting HTML form for a SAML request.
    #[must_use]
    pub fn form(encoded: &str, destination: &str, relay_state: Option<&str>) -> String {
        let relay_state_input = relay_state
            .map(|rs| {
                format!(
                    r#"<input type="hidden" name="{RELAY_STATE_PARAM}" value="{}"/>"#,
                    html_escape(rs)
                )
            })
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>SAML POST Binding</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">
        <input type="hidden" name="{SAML_REQUEST_PARAM}" value="{}"/>
        {}
        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
            html_escape(destination),
            encoded,
            relay_state_input
        )
    }

    /// Decodes a SAML request from HTTP-POST form data.
    pub fn decode(saml_request: &str) -> SamlResult<String> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(saml_request)
            .map_err(|e| SamlError::Base64Decode(e.to_string()))?;

        String::from_utf8(decoded)
            .map_err(|e| SamlError::Xml(format!("Invalid UTF-8 in message: {e}")))
    }
}

/// Escapes HTML special characters.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_and_decode_roundtrip() {
        let xml = r#"<samlp:AuthnRequest>test</samlp:AuthnRequest>"#;
        let encoded = HttpPostBinding::encode(xml);
        assert_eq!(HttpPostBinding::decode(&encoded).unwrap(), xml);
    }

    #[test]
    fn form_contains_fields() {
        let encoded = HttpPostBinding::encode("<Test/>");
        let html = HttpPostBinding::form(&encoded, "https://idp.example.com/sso", Some("state123"));

        assert!(html.contains("SAMLRequest"));
        assert!(html.contains("RelayState"));
        assert!(html.contains("value=\"state123\""));
        assert!(html.contains("action=\"https://idp.example.com/sso\""));
        assert!(html.contains("document.forms[0].submit()"));
    }

    #[test]
    fn form_without_relay_state() {
        let html = HttpPostBinding::form("ZW5j", "https://idp.example.com/sso", None);
        assert!(!html.contains("RelayState"));
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        assert!(HttpPostBinding::decode("not base64!").is_err());
    }

    #[test]
    fn html_escape_special_chars() {
        let escaped = html_escape(r#"<script>alert("xss")</script>"#);
        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('>'));
        assert!(!escaped.contains('"'));
    }
}
