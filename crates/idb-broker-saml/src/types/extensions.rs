//! SAML protocol message extensions.
//!
//! The broker appends a fixed set of vendor extension elements to its
//! outgoing requests. They are modelled as a closed set of variants, each
//! rendering its own XML fragment inside `<samlp:Extensions>`.

use serde::{Deserialize, Serialize};

use super::xml_escape;

/// eIDAS SAML extension namespace.
pub const EIDAS_EXT_NS: &str = "http://eidas.europa.eu/saml-extensions";

/// Broker key-hint extension namespace.
pub const KEY_EXT_NS: &str = "urn:idbroker:ext:key:1.0";

/// An extension element of an outgoing protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamlExtension {
    /// eIDAS service-provider-type marker (`<eidas:SPType>`).
    SpType(SpType),

    /// eIDAS requested-attributes marker
    /// (`<eidas:RequestedAttributes>`).
    RequestedAttributes(Vec<RequestedAttribute>),

    /// Key hint naming the key that signed the surrounding message.
    /// Appended only to Redirect-bound signed requests, where the
    /// detached signature cannot carry key info itself.
    KeyInfo {
        /// Name of the message signing key, if one should be advertised.
        message_signing_key_id: Option<String>,
    },
}

impl SamlExtension {
    /// Renders this extension as an XML fragment.
    #[must_use]
    pub fn to_fragment(&self) -> String {
        match self {
            Self::SpType(sp_type) => format!(
                "<eidas:SPType xmlns:eidas=\"{EIDAS_EXT_NS}\">{}</eidas:SPType>",
                sp_type.as_str()
            ),
            Self::RequestedAttributes(attributes) => {
                let mut fragment =
                    format!("<eidas:RequestedAttributes xmlns:eidas=\"{EIDAS_EXT_NS}\">");
                for attribute in attributes {
                    fragment.push_str(&format!(
                        "<eidas:RequestedAttribute Name=\"{}\" isRequired=\"{}\"/>",
                        xml_escape(&attribute.name),
                        attribute.required
                    ));
                }
                fragment.push_str("</eidas:RequestedAttributes>");
                fragment
            }
            Self::KeyInfo {
                message_signing_key_id,
            } => match message_signing_key_id {
                Some(key_id) => format!(
                    "<ibk:KeyInfo xmlns:ibk=\"{KEY_EXT_NS}\" MessageSigningKeyId=\"{}\"/>",
                    xml_escape(key_id)
                ),
                None => format!("<ibk:KeyInfo xmlns:ibk=\"{KEY_EXT_NS}\"/>"),
            },
        }
    }

    /// Returns true for the key-hint extension variant.
    #[must_use]
    pub const fn is_key_info(&self) -> bool {
        matches!(self, Self::KeyInfo { .. })
    }
}

/// eIDAS service provider sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpType {
    /// Public-sector service provider.
    #[default]
    Public,
    /// Private-sector service provider.
    Private,
}

impl SpType {
    /// Returns the element content for this SP type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

/// A requested subject attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedAttribute {
    /// Attribute name URI.
    pub name: String,
    /// Whether the attribute is mandatory for the request.
    pub required: bool,
}
