//! SAML Name ID types.
//!
//! The federated NameID asserted by the IdP at login must be replayed
//! verbatim in the later LogoutRequest, including its qualifiers. It is
//! stored between the two as its XML string serialization, so this
//! module also carries the string round-trip.

use serde::{Deserialize, Serialize};

use super::{extract_attribute, xml_escape, NameIdFormat};
use crate::error::{SamlError, SamlResult};

/// SAML Name ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameId {
    /// The actual identifier value.
    pub value: String,

    /// The format of the name identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// The security or administrative domain that qualifies the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_qualifier: Option<String>,

    /// The service provider's entity ID that qualifies the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sp_name_qualifier: Option<String>,
}

impl NameId {
    /// Creates a new name ID with the given value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: None,
            name_qualifier: None,
            sp_name_qualifier: None,
        }
    }

    /// Creates a new persistent name ID.
    #[must_use]
    pub fn persistent(value: impl Into<String>) -> Self {
        Self::new(value).with_format(NameIdFormat::Persistent)
    }

    /// Sets the format for this name ID.
    #[must_use]
    pub fn with_format(mut self, format: NameIdFormat) -> Self {
        self.format = Some(format.uri().to_string());
        self
    }

    /// Sets the name qualifier.
    #[must_use]
    pub fn with_name_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.name_qualifier = Some(qualifier.into());
        self
    }

    /// Sets the SP name qualifier.
    #[must_use]
    pub fn with_sp_name_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.sp_name_qualifier = Some(qualifier.into());
        self
    }

    /// Serializes this name ID as a standalone `<saml:NameID>` fragment.
    ///
    /// This is the form stored in session notes between login and
    /// logout; [`NameId::deserialize_from_string`] is its inverse.
    #[must_use]
    pub fn serialize_as_string(&self) -> String {
        let mut attrs = String::new();
        if let Some(ref format) = self.format {
            attrs.push_str(&format!(" Format=\"{}\"", xml_escape(format)));
        }
        if let Some(ref qualifier) = self.name_qualifier {
            attrs.push_str(&format!(" NameQualifier=\"{}\"", xml_escape(qualifier)));
        }
        if let Some(ref qualifier) = self.sp_name_qualifier {
            attrs.push_str(&format!(" SPNameQualifier=\"{}\"", xml_escape(qualifier)));
        }

        format!(
            "<saml:NameID xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\"{}>{}</saml:NameID>",
            attrs,
            xml_escape(&self.value)
        )
    }

    /// Reconstructs a name ID from its string serialization.
    ///
    /// # Errors
    ///
    /// Returns an error when the fragment has no NameID element or no
    /// value.
    pub fn deserialize_from_string(s: &str) -> SamlResult<Self> {
        let open_end = s
            .find('>')
            .ok_or_else(|| SamlError::Xml("not a NameID fragment".to_string()))?;
        if !s[..open_end].contains("NameID") {
            return Err(SamlError::Xml("not a NameID fragment".to_string()));
        }

        let close = s[open_end..]
            .find("</")
            .map(|pos| open_end + pos)
            .ok_or_else(|| SamlError::Xml("unclosed NameID fragment".to_string()))?;
        let value = xml_unescape(s[open_end + 1..close].trim());
        if value.is_empty() {
            return Err(SamlError::Xml("NameID fragment has no value".to_string()));
        }

        Ok(Self {
            value,
            format: extract_attribute(s, "NameID", "Format").map(|v| xml_unescape(&v)),
            name_qualifier: extract_attribute(s, "NameID", "NameQualifier")
                .map(|v| xml_unescape(&v)),
            sp_name_qualifier: extract_attribute(s, "NameID", "SPNameQualifier")
                .map(|v| xml_unescape(&v)),
        })
    }
}

/// Name ID policy for authentication requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameIdPolicy {
    /// The requested name ID format URI.
    pub format: String,

    /// Whether a new identifier may be created for this request.
    pub allow_create: bool,
}

impl NameIdPolicy {
    /// Creates a policy requesting the given format, with allow-create
    /// enabled (the broker always permits identifier creation).
    #[must_use]
    pub fn with_format(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            allow_create: true,
        }
    }
}

fn xml_unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_id_string_roundtrip() {
        let name_id = NameId::persistent("abc-123")
            .with_name_qualifier("https://idp.example.com")
            .with_sp_name_qualifier("https://sp.example.com");

        let serialized = name_id.serialize_as_string();
        let parsed = NameId::deserialize_from_string(&serialized).unwrap();
        assert_eq!(parsed, name_id);
    }

    #[test]
    fn name_id_roundtrip_escapes_value() {
        let name_id = NameId::new("a&b<c>");
        let serialized = name_id.serialize_as_string();
        assert!(!serialized.contains("a&b"));

        let parsed = NameId::deserialize_from_string(&serialized).unwrap();
        assert_eq!(parsed.value, "a&b<c>");
    }

    #[test]
    fn deserialize_rejects_garbage() {
        assert!(NameId::deserialize_from_string("not xml").is_err());
        assert!(NameId::deserialize_from_string("<saml:Issuer>x</saml:Issuer>").is_err());
        assert!(
            NameId::deserialize_from_string("<saml:NameID></saml:NameID>").is_err()
        );
    }

    #[test]
    fn name_id_policy_always_allows_create() {
        let policy = NameIdPolicy::with_format(NameIdFormat::Persistent.uri());
        assert!(policy.allow_create);
    }
}
