//! SAML AuthnRequest type and builder.
//!
//! The authentication request the broker sends to the external IdP at
//! the start of a login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{xml_escape, NameIdPolicy, SamlExtension, SAMLP_NS, SAML_NS};

/// SAML Authentication Request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthnRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the service provider issuing the request.
    pub issuer: String,

    /// The IdP URL this request is addressed to. When a preprocessor
    /// rewrites it, the rewritten value also becomes the transport
    /// destination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// The URL where the response should be sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion_consumer_service_url: Option<String>,

    /// Binding the IdP should use for the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_binding: Option<String>,

    /// Whether the IdP must authenticate the user directly.
    #[serde(default)]
    pub force_authn: bool,

    /// Name ID policy constraints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id_policy: Option<NameIdPolicy>,

    /// Requested authentication context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_authn_context: Option<RequestedAuthnContext>,

    /// Subject login hint, when forwarding one is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Extension elements, in append order.
    #[serde(default)]
    pub extensions: Vec<SamlExtension>,
}

impl AuthnRequest {
    /// Creates a new authentication request.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            id: format!("_id{}", uuid::Uuid::new_v4()),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            destination: None,
            assertion_consumer_service_url: None,
            protocol_binding: None,
            force_authn: false,
            name_id_policy: None,
            requested_authn_context: None,
            subject: None,
            extensions: Vec::new(),
        }
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Sets the assertion consumer service URL.
    #[must_use]
    pub fn with_acs_url(mut self, url: impl Into<String>) -> Self {
        self.assertion_consumer_service_url = Some(url.into());
        self
    }

    /// Sets the protocol binding for the response.
    #[must_use]
    pub fn with_protocol_binding(mut self, binding_uri: impl Into<String>) -> Self {
        self.protocol_binding = Some(binding_uri.into());
        self
    }

    /// Sets force authentication.
    #[must_use]
    pub const fn force_authn(mut self, force: bool) -> Self {
        self.force_authn = force;
        self
    }

    /// Sets the name ID policy.
    #[must_use]
    pub fn with_name_id_policy(mut self, policy: NameIdPolicy) -> Self {
        self.name_id_policy = Some(policy);
        self
    }

    /// Sets the requested authentication context.
    #[must_use]
    pub fn with_requested_authn_context(mut self, context: RequestedAuthnContext) -> Self {
        self.requested_authn_context = Some(context);
        self
    }

    /// Sets the subject login hint.
    #[must_use]
    pub fn with_subject(mut self, hint: impl Into<String>) -> Self {
        self.subject = Some(hint.into());
        self
    }

    /// Appends an extension element.
    #[must_use]
    pub fn add_extension(mut self, extension: SamlExtension) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Returns true if the key-hint extension is present.
    #[must_use]
    pub fn has_key_info_extension(&self) -> bool {
        self.extensions.iter().any(SamlExtension::is_key_info)
    }

    /// Serializes this request as an XML document.
    ///
    /// Child order follows the AuthnRequest schema: Issuer, Extensions,
    /// Subject, NameIDPolicy, RequestedAuthnContext. The signer inserts
    /// the `<ds:Signature>` element directly after the Issuer.
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
        if let Some(ref acs) = self.assertion_consumer_service_url {
            attrs.push_str(&format!(
                " AssertionConsumerServiceURL=\"{}\"",
                xml_escape(acs)
            ));
        }
        if let Some(ref binding) = self.protocol_binding {
            attrs.push_str(&format!(" ProtocolBinding=\"{}\"", xml_escape(binding)));
        }
        if self.force_authn {
            attrs.push_str(" ForceAuthn=\"true\"");
        }

        let mut children = format!("<saml:Issuer>{}</saml:Issuer>", xml_escape(&self.issuer));

        if !self.extensions.is_empty() {
            children.push_str("<samlp:Extensions>");
            for extension in &self.extensions {
                children.push_str(&extension.to_fragment());
            }
            children.push_str("</samlp:Extensions>");
        }

        if let Some(ref subject) = self.subject {
            children.push_str(&format!(
                "<saml:Subject><saml:NameID>{}</saml:NameID></saml:Subject>",
                xml_escape(subject)
            ));
        }

        if let Some(ref policy) = self.name_id_policy {
            children.push_str(&format!(
                "<samlp:NameIDPolicy Format=\"{}\" AllowCreate=\"{}\"/>",
                xml_escape(&policy.format),
                policy.allow_create
            ));
        }

        if let Some(ref context) = self.requested_authn_context {
            children.push_str(&context.to_fragment());
        }

        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <samlp:AuthnRequest xmlns:samlp=\"{SAMLP_NS}\" xmlns:saml=\"{SAML_NS}\"{attrs}>{children}</samlp:AuthnRequest>"
        )
    }
}

/// Requested authentication context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedAuthnContext {
    /// Comparison method for the authentication context.
    #[serde(default)]
    pub comparison: AuthnContextComparison,

    /// Acceptable authentication context class references.
    #[serde(default)]
    pub class_refs: Vec<String>,

    /// Acceptable authentication context declaration references.
    #[serde(default)]
    pub decl_refs: Vec<String>,
}

impl RequestedAuthnContext {
    /// Renders the `<samlp:RequestedAuthnContext>` fragment.
    #[must_use]
    pub fn to_fragment(&self) -> String {
        let mut fragment = format!(
            "<samlp:RequestedAuthnContext Comparison=\"{}\">",
            self.comparison.as_str()
        );
        for class_ref in &self.class_refs {
            fragment.push_str(&format!(
                "<saml:AuthnContextClassRef>{}</saml:AuthnContextClassRef>",
                xml_escape(class_ref)
            ));
        }
        for decl_ref in &self.decl_refs {
            fragment.push_str(&format!(
                "<saml:AuthnContextDeclRef>{}</saml:AuthnContextDeclRef>",
                xml_escape(decl_ref)
            ));
        }
        fragment.push_str("</samlp:RequestedAuthnContext>");
        fragment
    }
}

/// Authentication context comparison methods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthnContextComparison {
    /// Exact match required.
    #[default]
    Exact,
    /// Match must be at least as strong.
    Minimum,
    /// Match must be at most as strong.
    Maximum,
    /// Match must be stronger.
    Better,
}

impl AuthnContextComparison {
    /// Returns the attribute value for this comparison.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::Better => "better",
        }
    }
}
