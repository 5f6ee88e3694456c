//! XML Signature creation.
//!
//! Enveloped XML-DSig signatures for SAML documents, plus the detached
//! query-string signature used by the HTTP-Redirect binding.

use base64::Engine;

use crate::error::{SamlError, SamlResult};
use crate::types::{RELAY_STATE_PARAM, SAML_REQUEST_PARAM, SIGNATURE_PARAM, SIG_ALG_PARAM};

use super::{SignatureAlgorithm, SignatureConfig};

/// XML document signer.
pub struct XmlSigner {
    /// The private key in DER format.
    private_key_der: Vec<u8>,
    /// The X.509 certificate in DER format (optional).
    certificate_der: Option<Vec<u8>>,
    /// Value for the `<ds:KeyName>` hint (optional).
    key_name: Option<String>,
    /// Signature configuration.
    config: SignatureConfig,
}

impl XmlSigner {
    /// Creates a new signer with an RSA private key.
    ///
    /// # Arguments
    ///
    /// * `private_key_der` - The private key in DER format
    /// * `certificate_der` - Optional X.509 certificate in DER format
    pub fn new(private_key_der: Vec<u8>, certificate_der: Option<Vec<u8>>) -> Self {
        Self {
            private_key_der,
            certificate_der,
            key_name: None,
            config: SignatureConfig::default(),
        }
    }

    /// Creates a new signer from PEM-encoded key and certificate.
    pub fn from_pem(private_key_pem: &str, certificate_pem: Option<&str>) -> SamlResult<Self> {
        let private_key_der = pem_to_der(private_key_pem, "PRIVATE KEY")
            .or_else(|| pem_to_der(private_key_pem, "RSA PRIVATE KEY"))
            .ok_or_else(|| SamlError::Configuration("Invalid private key PEM".to_string()))?;

        let certificate_der = certificate_pem.and_then(|pem| pem_to_der(pem, "CERTIFICATE"));

        Ok(Self::new(private_key_der, certificate_der))
    }

    /// Sets the signature configuration.
    #[must_use]
    pub fn with_config(mut self, config: SignatureConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the `<ds:KeyName>` hint.
    #[must_use]
    pub fn with_key_name(mut self, key_name: Option<String>) -> Self {
        self.key_name = key_name;
        self
    }

    /// Signs an XML document with an enveloped signature.
    ///
    /// The `<ds:Signature>` element is inserted as the immediate next
    /// sibling of the document root's first child element. Peer
    /// verifiers in this ecosystem expect exactly that placement; a
    /// signature appended at the end of the root stays cryptographically
    /// valid but fails interoperability.
    ///
    /// # Arguments
    ///
    /// * `xml` - The XML document to sign
    /// * `reference_id` - The ID of the element to sign (without '#')
    pub fn sign(&self, xml: &str, reference_id: &str) -> SamlResult<String> {
        if self.config.algorithm.is_deprecated() {
            return Err(SamlError::SignatureCreation(
                "refusing to sign with SHA-1".to_string(),
            ));
        }

        // Digest the referenced element (the enveloped-signature
        // transform applies: the signature is not yet in the document).
        let element_start = find_element_with_id(xml, reference_id)?;
        let canonical_element = canonicalize_element(xml, element_start)?;
        let digest = calculate_digest(&canonical_element, self.config.algorithm);
        let digest_b64 = base64::engine::general_purpose::STANDARD.encode(&digest);

        let signed_info = build_signed_info(
            reference_id,
            &digest_b64,
            self.config.algorithm,
            self.config.canonicalization,
        );

        let canonical_signed_info = normalize_xml_whitespace(&signed_info);
        let signature_value = self.sign_bytes(canonical_signed_info.as_bytes())?;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(&signature_value);

        let signature_element = build_signature_element(
            &signed_info,
            &signature_b64,
            self.key_name.as_deref(),
            self.certificate_der.as_deref(),
            &self.config,
        );

        let insert_position = find_insert_position(xml)?;
        Ok(insert_signature(xml, insert_position, &signature_element))
    }

    /// Builds the signed query string for a Redirect-bound request.
    ///
    /// The detached signature covers exactly the query string as it will
    /// appear in the redirect URL: `SAMLRequest`, `RelayState` (when
    /// present) and `SigAlg`, in that order. Returns the full query
    /// string with the `Signature` parameter appended.
    ///
    /// # Arguments
    ///
    /// * `encoded_message` - The deflated+base64 message (not yet
    ///   URL-encoded)
    /// * `relay_state` - Optional relay state value
    pub fn sign_redirect_query(
        &self,
        encoded_message: &str,
        relay_state: Option<&str>,
    ) -> SamlResult<String> {
        if self.config.algorithm.is_deprecated() {
            return Err(SamlError::SignatureCreation(
                "refusing to sign with SHA-1".to_string(),
            ));
        }

        let mut query = format!(
            "{SAML_REQUEST_PARAM}={}",
            urlencoding::encode(encoded_message)
        );
        if let Some(rs) = relay_state {
            query.push_str(&format!("&{RELAY_STATE_PARAM}={}", urlencoding::encode(rs)));
        }
        query.push_str(&format!(
            "&{SIG_ALG_PARAM}={}",
            urlencoding::encode(self.config.algorithm.uri())
        ));

        let signature = self.sign_bytes(query.as_bytes())?;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(&signature);
        query.push_str(&format!(
            "&{SIGNATURE_PARAM}={}",
            urlencoding::encode(&signature_b64)
        ));

        Ok(query)
    }

    /// Signs raw bytes using the configured algorithm.
    fn sign_bytes(&self, data: &[u8]) -> SamlResult<Vec<u8>> {
        let algorithm = match self.config.algorithm {
            SignatureAlgorithm::RsaSha256 => idb_crypto::RsaAlgorithm::Rs256,
            SignatureAlgorithm::RsaSha384 => idb_crypto::RsaAlgorithm::Rs384,
            SignatureAlgorithm::RsaSha512 => idb_crypto::RsaAlgorithm::Rs512,
            SignatureAlgorithm::RsaSha1 => {
                return Err(SamlError::SignatureCreation(
                    "refusing to sign with SHA-1".to_string(),
                ));
            }
        };

        Ok(idb_crypto::rsa_sign(&self.private_key_der, data, algorithm)?)
    }
}

/// Extracts DER data from a PEM string.
#[must_use]
pub fn pem_to_der(pem: &str, label: &str) -> Option<Vec<u8>> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let start = pem.find(&begin)? + begin.len();
    let end_pos = pem.find(&end)?;

    let b64_data: String = pem[start..end_pos]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    base64::engine::general_purpose::STANDARD.decode(&b64_data).ok()
}

/// Finds the start of the element carrying the given ID attribute.
fn find_element_with_id(xml: &str, reference_id: &str) -> SamlResult<usize> {
    let id_pattern = format!("ID=\"{reference_id}\"");
    let alt_pattern = format!("Id=\"{reference_id}\"");

    let attr_pos = xml
        .find(&id_pattern)
        .or_else(|| xml.find(&alt_pattern))
        .ok_or_else(|| {
            SamlError::SignatureCreation(format!("Element with ID '{reference_id}' not found"))
        })?;

    // Walk back to the element's '<'.
    let mut tag_start = attr_pos;
    while tag_start > 0 && xml.as_bytes()[tag_start - 1] != b'<' {
        tag_start -= 1;
    }
    if tag_start > 0 {
        tag_start -= 1;
    }

    Ok(tag_start)
}

/// Finds where to insert the signature: immediately after the close of
/// the document root's first child element.
fn find_insert_position(xml: &str) -> SamlResult<usize> {
    // Skip any XML declaration.
    let mut pos = 0;
    while let Some(decl) = xml[pos..].find("<?") {
        let decl_end = xml[pos + decl..]
            .find("?>")
            .map(|p| pos + decl + p + 2)
            .ok_or_else(|| SamlError::SignatureCreation("Malformed XML declaration".to_string()))?;
        pos = decl_end;
    }

    let root_start = xml[pos..]
        .find('<')
        .map(|p| pos + p)
        .ok_or_else(|| SamlError::SignatureCreation("No root element".to_string()))?;
    let root_open_end = xml[root_start..]
        .find('>')
        .map(|p| root_start + p + 1)
        .ok_or_else(|| SamlError::SignatureCreation("Malformed root element".to_string()))?;

    let first_child_start = xml[root_open_end..]
        .find('<')
        .map(|p| root_open_end + p)
        .ok_or_else(|| SamlError::SignatureCreation("Root element has no children".to_string()))?;
    if xml[first_child_start..].starts_with("</") {
        // Empty root: place the signature as the only child.
        return Ok(first_child_start);
    }

    element_end(xml, first_child_start)
}

/// Returns the position just past the end of the element starting at
/// `start`, handling self-closing tags and matching close tags.
fn element_end(xml: &str, start: usize) -> SamlResult<usize> {
    let xml_bytes = xml.as_bytes();

    let mut tag_end = start + 1;
    while tag_end < xml.len()
        && xml_bytes[tag_end] != b' '
        && xml_bytes[tag_end] != b'>'
        && xml_bytes[tag_end] != b'/'
    {
        tag_end += 1;
    }
    let full_tag_name = &xml[start + 1..tag_end];

    let open_end = xml[start..]
        .find('>')
        .map(|p| start + p)
        .ok_or_else(|| SamlError::SignatureCreation("Malformed XML element".to_string()))?;
    if xml.as_bytes()[open_end - 1] == b'/' {
        return Ok(open_end + 1);
    }

    let close_pattern = format!("</{full_tag_name}");
    let close_pos = xml[start..].find(&close_pattern).ok_or_else(|| {
        SamlError::SignatureCreation(format!("Unclosed XML element '{full_tag_name}'"))
    })?;
    xml[start + close_pos..]
        .find('>')
        .map(|p| start + close_pos + p + 1)
        .ok_or_else(|| SamlError::SignatureCreation("Malformed closing tag".to_string()))
}

/// Canonicalizes an XML element for digesting.
fn canonicalize_element(xml: &str, start: usize) -> SamlResult<String> {
    let end = element_end(xml, start)?;
    Ok(normalize_xml_whitespace(&xml[start..end]))
}

/// Normalizes XML whitespace (simplified exclusive C14N).
fn normalize_xml_whitespace(xml: &str) -> String {
    xml.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Calculates the digest of data using the digest half of the signature
/// algorithm.
fn calculate_digest(data: &str, algorithm: SignatureAlgorithm) -> Vec<u8> {
    match algorithm {
        SignatureAlgorithm::RsaSha256 | SignatureAlgorithm::RsaSha1 => {
            idb_crypto::sha256(data.as_bytes())
        }
        SignatureAlgorithm::RsaSha384 => idb_crypto::sha384(data.as_bytes()),
        SignatureAlgorithm::RsaSha512 => idb_crypto::sha512(data.as_bytes()),
    }
}

/// Builds the SignedInfo element.
fn build_signed_info(
    reference_id: &str,
    digest_b64: &str,
    algorithm: SignatureAlgorithm,
    canonicalization: super::CanonicalizationAlgorithm,
) -> String {
    format!(
        r##"<ds:SignedInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
<ds:CanonicalizationMethod Algorithm="{}"/>
<ds:SignatureMethod Algorithm="{}"/>
<ds:Reference URI="#{}">
<ds:Transforms>
<ds:Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/>
<ds:Transform Algorithm="{}"/>
</ds:Transforms>
<ds:DigestMethod Algorithm="{}"/>
<ds:DigestValue>{}</ds:DigestValue>
</ds:Reference>
</ds:SignedInfo>"##,
        canonicalization.uri(),
        algorithm.uri(),
        reference_id,
        canonicalization.uri(),
        algorithm.digest_uri(),
        digest_b64
    )
}

/// Builds the complete Signature element.
fn build_signature_element(
    signed_info: &str,
    signature_value: &str,
    key_name: Option<&str>,
    certificate_der: Option<&[u8]>,
    config: &SignatureConfig,
) -> String {
    let mut signature = format!(
        r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
{signed_info}
<ds:SignatureValue>{signature_value}</ds:SignatureValue>"#
    );

    let cert = certificate_der.filter(|_| config.include_certificate);
    if key_name.is_some() || cert.is_some() {
        signature.push_str("\n<ds:KeyInfo>");
        if let Some(name) = key_name {
            signature.push_str(&format!(
                "\n<ds:KeyName>{}</ds:KeyName>",
                crate::types::xml_escape(name)
            ));
        }
        if let Some(cert) = cert {
            let cert_b64 = base64::engine::general_purpose::STANDARD.encode(cert);
            signature.push_str(&format!(
                "\n<ds:X509Data>\n<ds:X509Certificate>{cert_b64}</ds:X509Certificate>\n</ds:X509Data>"
            ));
        }
        signature.push_str("\n</ds:KeyInfo>");
    }

    signature.push_str("\n</ds:Signature>");
    signature
}

/// Inserts the signature into the XML document.
fn insert_signature(xml: &str, position: usize, signature: &str) -> String {
    format!("{}{}{}", &xml[..position], signature, &xml[position..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pem_to_der_extraction() {
        let pem = "-----BEGIN CERTIFICATE-----\nTUIJ\n-----END CERTIFICATE-----";
        assert!(pem_to_der(pem, "CERTIFICATE").is_some());
        assert!(pem_to_der(pem, "PRIVATE KEY").is_none());
    }

    #[test]
    fn normalize_whitespace() {
        let input = "  <element>   content   </element>  ";
        assert_eq!(normalize_xml_whitespace(input), "<element> content </element>");
    }

    #[test]
    fn insert_position_after_first_child() {
        let xml = r#"<?xml version="1.0"?><Root ID="_r"><Issuer>me</Issuer><Next/></Root>"#;
        let pos = find_insert_position(xml).unwrap();
        assert_eq!(&xml[..pos], r#"<?xml version="1.0"?><Root ID="_r"><Issuer>me</Issuer>"#);
    }

    #[test]
    fn insert_position_after_self_closing_first_child() {
        let xml = r#"<Root ID="_r"><Marker/><Next>x</Next></Root>"#;
        let pos = find_insert_position(xml).unwrap();
        assert_eq!(&xml[..pos], r#"<Root ID="_r"><Marker/>"#);
    }

    #[test]
    fn insert_position_in_empty_root() {
        let xml = r#"<Root ID="_r"></Root>"#;
        let pos = find_insert_position(xml).unwrap();
        assert_eq!(&xml[..pos], r#"<Root ID="_r">"#);
    }

    #[test]
    fn find_element_rejects_unknown_id() {
        let xml = r#"<Root ID="_r"/>"#;
        assert!(find_element_with_id(xml, "_other").is_err());
        assert_eq!(find_element_with_id(xml, "_r").unwrap(), 0);
    }

    #[test]
    fn signed_info_references_element() {
        let signed_info = build_signed_info(
            "_abc",
            "ZGlnZXN0",
            SignatureAlgorithm::RsaSha256,
            super::super::CanonicalizationAlgorithm::ExclusiveC14N,
        );
        assert!(signed_info.contains("URI=\"#_abc\""));
        assert!(signed_info.contains("xmldsig-more#rsa-sha256"));
        assert!(signed_info.contains("xmlenc#sha256"));
        assert!(signed_info.contains("xml-exc-c14n#"));
    }

    #[test]
    fn signature_element_carries_key_name() {
        let element = build_signature_element(
            "<ds:SignedInfo/>",
            "c2ln",
            Some("kid-1"),
            None,
            &SignatureConfig::default(),
        );
        assert!(element.contains("<ds:KeyName>kid-1</ds:KeyName>"));
        assert!(!element.contains("X509Certificate"));
    }
}
