//! Core SAML types and message builders.

mod authn_request;
mod constants;
mod extensions;
mod logout;
mod name_id;

pub use authn_request::*;
pub use constants::*;
pub use extensions::*;
pub use logout::*;
pub use name_id::*;

/// Escapes XML special characters for element content and attribute
/// values.
#[must_use]
pub(crate) fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Extracts an attribute value from the opening tag of an XML element.
///
/// Lightweight lookup for the well-formed documents this crate itself
/// produces; matches both prefixed and unprefixed element names.
pub(crate) fn extract_attribute(xml: &str, element: &str, attribute: &str) -> Option<String> {
    let patterns = [
        format!("<{element} "),
        format!("<samlp:{element} "),
        format!("<saml:{element} "),
        format!("<md:{element} "),
    ];

    for pattern in &patterns {
        if let Some(pos) = xml.find(pattern.as_str()) {
            let end = xml[pos..].find('>')?;
            let element_str = &xml[pos..pos + end];

            let attr_pattern = format!("{attribute}=\"");
            if let Some(attr_start) = element_str.find(&attr_pattern) {
                let value_start = attr_start + attr_pattern.len();
                let value_end = element_str[value_start..].find('"')?;
                return Some(element_str[value_start..value_start + value_end].to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_special_chars() {
        assert_eq!(
            xml_escape(r#"<a b="c&d">"#),
            "&lt;a b=&quot;c&amp;d&quot;&gt;"
        );
    }

    #[test]
    fn extract_attribute_prefixed() {
        let xml = r#"<samlp:AuthnRequest ID="_abc" Version="2.0">"#;
        assert_eq!(
            extract_attribute(xml, "AuthnRequest", "ID").as_deref(),
            Some("_abc")
        );
        assert_eq!(extract_attribute(xml, "AuthnRequest", "Missing"), None);
    }
}
