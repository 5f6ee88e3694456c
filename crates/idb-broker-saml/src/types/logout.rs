//! SAML LogoutRequest type and builder.
//!
//! Single logout request issued toward the external IdP, carrying the
//! correlation identifiers captured at login. A request without a NameID
//! can still be sent on the backchannel as a best effort; front-channel
//! flows refuse to build one (see the provider facade).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{xml_escape, NameId, SamlExtension, SAMLP_NS, SAML_NS};

/// SAML Logout Request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the requester.
    pub issuer: String,

    /// The IdP URL this request is addressed to. When a preprocessor
    /// rewrites it, the rewritten value also becomes the transport
    /// destination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// The federated name identifier of the principal to log out, as
    /// asserted by the IdP at login. Absent when no correlation was
    /// stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id: Option<NameId>,

    /// The IdP session index to terminate, when one was asserted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_index: Option<String>,

    /// Time after which the request is no longer valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// Extension elements, in append order.
    #[serde(default)]
    pub extensions: Vec<SamlExtension>,
}

impl LogoutRequest {
    /// Creates a new logout request.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            id: format!("_id{}", uuid::Uuid::new_v4()),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            destination: None,
            name_id: None,
            session_index: None,
            not_on_or_after: None,
            extensions: Vec::new(),
        }
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Sets the name ID of the principal to log out.
    #[must_use]
    pub fn with_name_id(mut self, name_id: NameId) -> Self {
        self.name_id = Some(name_id);
        self
    }

    /// Sets the session index to terminate.
    #[must_use]
    pub fn with_session_index(mut self, index: impl Into<String>) -> Self {
        self.session_index = Some(index.into());
        self
    }

    /// Sets the validity window from now, in seconds.
    #[must_use]
    pub fn assertion_expiration(mut self, seconds: u32) -> Self {
        self.not_on_or_after = Some(Utc::now() + Duration::seconds(i64::from(seconds)));
        self
    }

    /// Appends an extension element.
    #[must_use]
    pub fn add_extension(mut self, extension: SamlExtension) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Serializes this request as an XML document.
    ///
    /// Child order follows the LogoutRequest schema: Issuer, Extensions,
    /// NameID, SessionIndex. The signer inserts the `<ds:Signature>`
    /// element directly after the Issuer.
    #[must_use]
    pub fn to_document(&self) -> String {
        let mut attrs = format!(
            " ID=\"{}\" Version=\"2.0\" IssueInstant=\"{}\"",
            xml_escape(&self.id),
            self.issue_instant.format("%Y-%m-%dT%H:%M:%SZ"),
        );
        if let Some(ref destination) = self.destination {
            attrs.push_str(&format!(" Destination=\"{}\"", xml_escape(destination)));
        }
        if let Some(not_on_or_after) = self.not_on_or_after {
            attrs.push_str(&format!(
                " NotOnOrAfter=\"{}\"",
                not_on_or_after.format("%Y-%m-%dT%H:%M:%SZ")
            ));
        }

        let mut children = format!("<saml:Issuer>{}</saml:Issuer>", xml_escape(&self.issuer));

        if !self.extensions.is_empty() {
            children.push_str("<samlp:Extensions>");
            for extension in &self.extensions {
                children.push_str(&extension.to_fragment());
            }
            children.push_str("</samlp:Extensions>");
        }

        if let Some(ref name_id) = self.name_id {
            // The root already declares the assertion namespace; the
            // NameID is re-serialized without a redundant declaration.
            let mut nid_attrs = String::new();
            if let Some(ref format) = name_id.format {
                nid_attrs.push_str(&format!(" Format=\"{}\"", xml_escape(format)));
            }
            if let Some(ref qualifier) = name_id.name_qualifier {
                nid_attrs.push_str(&format!(" NameQualifier=\"{}\"", xml_escape(qualifier)));
            }
            if let Some(ref qualifier) = name_id.sp_name_qualifier {
                nid_attrs.push_str(&format!(" SPNameQualifier=\"{}\"", xml_escape(qualifier)));
            }
            children.push_str(&format!(
                "<saml:NameID{}>{}</saml:NameID>",
                nid_attrs,
                xml_escape(&name_id.value)
            ));
        }

        if let Some(ref index) = self.session_index {
            children.push_str(&format!(
                "<samlp:SessionIndex>{}</samlp:SessionIndex>",
                xml_escape(index)
            ));
        }

        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <samlp:LogoutRequest xmlns:samlp=\"{SAMLP_NS}\" xmlns:saml=\"{SAML_NS}\"{attrs}>{children}</samlp:LogoutRequest>"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_carries_correlation() {
        let request = LogoutRequest::new("https://sp.example.com")
            .with_destination("https://idp.example.com/slo")
            .with_name_id(NameId::persistent("abc-123"))
            .with_session_index("_idx42")
            .assertion_expiration(60);

        let doc = request.to_document();
        assert!(doc.contains("<samlp:LogoutRequest"));
        assert!(doc.contains(">abc-123</saml:NameID>"));
        assert!(doc.contains("<samlp:SessionIndex>_idx42</samlp:SessionIndex>"));
        assert!(doc.contains("NotOnOrAfter="));
    }

    #[test]
    fn document_without_correlation_omits_subject() {
        let doc = LogoutRequest::new("https://sp.example.com").to_document();
        assert!(!doc.contains("NameID"));
        assert!(!doc.contains("SessionIndex"));
    }

    #[test]
    fn expiration_window_is_in_the_future() {
        let request = LogoutRequest::new("https://sp.example.com").assertion_expiration(60);
        assert!(request.not_on_or_after.unwrap() > Utc::now());
    }
}
