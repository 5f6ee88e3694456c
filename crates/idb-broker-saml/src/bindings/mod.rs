//! SAML binding encoders.
//!
//! Serializes a composed protocol message into one of the two supported
//! transport artifacts:
//!
//! - **HTTP-POST** - base64 in an auto-submitting HTML form, signature
//!   embedded in the XML when signing is required
//! - **HTTP-Redirect** - deflated+base64+URL-encoded query parameter,
//!   signed (when required) with a detached signature over the query
//!   string
//!
//! The [`Saml2BindingBuilder`] carries the relay state and optional
//! signing setup shared by both encodings; the binding choice is made by
//! the caller per configuration, never negotiated with the peer.

mod post;
mod redirect;

pub use post::*;
pub use redirect::*;

use crate::error::{SamlError, SamlResult};
use crate::signature::{SignatureAlgorithm, SignatureConfig, XmlSigner};

/// Builder for binding a composed SAML document to a transport artifact.
pub struct Saml2BindingBuilder {
    relay_state: Option<String>,
    signer: Option<XmlSigner>,
}

impl Saml2BindingBuilder {
    /// Creates a builder with no relay state and no signing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            relay_state: None,
            signer: None,
        }
    }

    /// Binds the relay state round-tripped through the IdP.
    #[must_use]
    pub fn relay_state(mut self, relay_state: impl Into<String>) -> Self {
        self.relay_state = Some(relay_state.into());
        self
    }

    /// Enables signing with the given key material.
    ///
    /// # Arguments
    ///
    /// * `key_name` - Value for the `<ds:KeyName>` hint, per the
    ///   configured key-name transformer
    /// * `private_key_der` - Signing key in DER format
    /// * `certificate_pem` - Certificate embedded in the KeyInfo
    /// * `algorithm` - Signature algorithm
    #[must_use]
    pub fn sign_with(
        mut self,
        key_name: Option<String>,
        private_key_der: Vec<u8>,
        certificate_pem: Option<&str>,
        algorithm: SignatureAlgorithm,
    ) -> Self {
        let certificate_der =
            certificate_pem.and_then(|pem| crate::signature::pem_to_der(pem, "CERTIFICATE"));
        self.signer = Some(
            XmlSigner::new(private_key_der, certificate_der)
                .with_key_name(key_name)
                .with_config(SignatureConfig::with_algorithm(algorithm)),
        );
        self
    }

    /// Encodes a document for the HTTP-POST binding, embedding an
    /// enveloped signature when signing is enabled.
    pub fn post_binding(&self, document: &str) -> SamlResult<PostBindingArtifact> {
        let signed = match &self.signer {
            Some(signer) => {
                let id = document_id(document).ok_or_else(|| {
                    SamlError::SignatureCreation("document root has no ID attribute".to_string())
                })?;
                signer.sign(document, &id)?
            }
            None => document.to_string(),
        };

        Ok(PostBindingArtifact {
            encoded: HttpPostBinding::encode(&signed),
            relay_state: self.relay_state.clone(),
        })
    }

    /// Encodes a document for the HTTP-Redirect binding, appending a
    /// detached query-string signature when signing is enabled.
    pub fn redirect_binding(&self, document: &str) -> SamlResult<RedirectBindingArtifact> {
        let encoded = HttpRedirectBinding::encode(document)?;

        let query = match &self.signer {
            Some(signer) => signer.sign_redirect_query(&encoded, self.relay_state.as_deref())?,
            None => {
                let mut query = format!(
                    "{}={}",
                    crate::types::SAML_REQUEST_PARAM,
                    urlencoding::encode(&encoded)
                );
                if let Some(ref rs) = self.relay_state {
                    query.push_str(&format!(
                        "&{}={}",
                        crate::types::RELAY_STATE_PARAM,
                        urlencoding::encode(rs)
                    ));
                }
                query
            }
        };

        Ok(RedirectBindingArtifact { query })
    }
}

impl Default for Saml2BindingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A message encoded for HTTP-POST transport.
#[derive(Debug, Clone)]
pub struct PostBindingArtifact {
    encoded: String,
    relay_state: Option<String>,
}

impl PostBindingArtifact {
    /// The base64-encoded message, as placed in the `SAMLRequest` form
    /// field. Backchannel logout posts exactly this value.
    #[must_use]
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// Builds the auto-submitting HTML form posting to `destination`.
    #[must_use]
    pub fn request(&self, destination: &str) -> String {
        HttpPostBinding::form(&self.encoded, destination, self.relay_state.as_deref())
    }
}

/// A message encoded for HTTP-Redirect transport.
#[derive(Debug, Clone)]
pub struct RedirectBindingArtifact {
    query: String,
}

impl RedirectBindingArtifact {
    /// Builds the full redirect URL for `destination`.
    #[must_use]
    pub fn request(&self, destination: &str) -> String {
        append_query(destination, &self.query)
    }
}

/// Extracts the ID attribute from a document's root element.
fn document_id(xml: &str) -> Option<String> {
    let root_start = find_root_start(xml)?;
    let open_end = xml[root_start..].find('>')? + root_start;
    let open_tag = &xml[root_start..open_end];

    let attr_start = open_tag.find(" ID=\"")? + 5;
    let attr_end = open_tag[attr_start..].find('"')?;
    Some(open_tag[attr_start..attr_start + attr_end].to_string())
}

fn find_root_start(xml: &str) -> Option<usize> {
    let mut pos = 0;
    loop {
        let tag = xml[pos..].find('<')? + pos;
        if xml[tag..].starts_with("<?") {
            pos = xml[tag..].find("?>")? + tag + 2;
        } else {
            return Some(tag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_skips_declaration() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<samlp:AuthnRequest ID="_id123" Version="2.0"></samlp:AuthnRequest>"#;
        assert_eq!(document_id(xml).as_deref(), Some("_id123"));
    }

    #[test]
    fn document_id_missing() {
        assert_eq!(document_id("<Root Version=\"2.0\"/>"), None);
    }

    #[test]
    fn unsigned_redirect_roundtrip_recovers_document() {
        let xml = r#"<samlp:AuthnRequest ID="_a">content</samlp:AuthnRequest>"#;
        let artifact = Saml2BindingBuilder::new()
            .relay_state("rs-1")
            .redirect_binding(xml)
            .unwrap();
        let url = artifact.request("https://idp.example.com/sso");

        let decoded = HttpRedirectBinding::decode_url(&url).unwrap();
        assert_eq!(decoded.xml, xml);
        assert_eq!(decoded.relay_state.as_deref(), Some("rs-1"));
        assert!(decoded.signature.is_none());
    }

    #[test]
    fn unsigned_post_binding_encodes_document() {
        let xml = r#"<samlp:LogoutRequest ID="_b"/>"#;
        let artifact = Saml2BindingBuilder::new().post_binding(xml).unwrap();
        assert_eq!(HttpPostBinding::decode(artifact.encoded()).unwrap(), xml);

        let html = artifact.request("https://idp.example.com/slo");
        assert!(html.contains("action=\"https://idp.example.com/slo\""));
    }
}
