//! Provider configuration snapshot.
//!
//! A [`ProviderConfig`] is an immutable per-request snapshot of the
//! broker's SAML identity-provider settings. It is read once at the start
//! of a login, logout or metadata export and never cached across calls.

use serde::{Deserialize, Serialize};

use crate::signature::SignatureAlgorithm;
use crate::types::AuthnContextComparison;

/// SAML identity-provider configuration as stored by the broker admin.
///
/// Free-text entries (authn-context ref lists) keep their stored JSON
/// form; accessors parse them on demand and degrade to empty lists on
/// malformed input rather than failing the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Broker alias, used in the SP endpoint path
    /// (`/realms/{realm}/broker/{alias}/endpoint`).
    pub alias: String,

    /// SP entity id override. When unset or empty the entity id is
    /// derived from the realm (`{base}/realms/{name}`).
    pub entity_id: Option<String>,

    /// IdP single sign-on service URL (AuthnRequest destination).
    pub single_sign_on_service_url: String,

    /// IdP single logout service URL. Unset means single logout is not
    /// configured and logout is a local-only operation.
    pub single_logout_service_url: Option<String>,

    /// Requested NameID policy format URI. Defaults to persistent when
    /// unset.
    pub name_id_policy_format: Option<String>,

    /// Ask the IdP to deliver the Response over POST instead of
    /// Redirect.
    pub post_binding_response: bool,

    /// Send the AuthnRequest over POST instead of Redirect.
    pub post_binding_authn_request: bool,

    /// Send front-channel logout requests over POST instead of Redirect.
    pub post_binding_logout: bool,

    /// Sign outgoing AuthnRequests (and logout requests).
    pub want_authn_requests_signed: bool,

    /// Advertise in metadata that assertions must be signed.
    pub want_assertions_signed: bool,

    /// Advertise in metadata that assertions must be encrypted.
    pub want_assertions_encrypted: bool,

    /// Sign the exported SP metadata document.
    pub sign_sp_metadata: bool,

    /// Force re-authentication at the IdP.
    pub force_authn: bool,

    /// Forward the application's login hint as the request subject.
    pub login_hint: bool,

    /// The IdP supports backchannel logout. When set, logout always goes
    /// over the backchannel regardless of the front-channel binding
    /// preference.
    pub backchannel_supported: bool,

    /// For signed Redirect-bound requests, append an Extensions element
    /// carrying the signing key id. POST-bound requests never carry it;
    /// the embedded signature already names the key.
    pub add_extensions_element_with_key_info: bool,

    /// Signature algorithm name (`"RSA_SHA256"`, `"RSA_SHA512"`, ...).
    /// Unset or unrecognized values fall back to RSA-SHA256.
    pub signature_algorithm: Option<String>,

    /// JSON-encoded list of authn context class ref URIs.
    pub authn_context_class_refs: Option<String>,

    /// JSON-encoded list of authn context declaration ref URIs.
    pub authn_context_decl_refs: Option<String>,

    /// Requested authn context comparison mode. The RequestedAuthnContext
    /// element is only emitted when this or one of the ref lists is
    /// configured.
    pub authn_context_comparison: Option<AuthnContextComparison>,

    /// How the `<ds:KeyName>` hint is derived from the signing key.
    pub key_name_transformer: KeyNameTransformer,
}

impl ProviderConfig {
    /// Returns the configured signature algorithm, falling back to
    /// RSA-SHA256 when unset or unrecognized.
    #[must_use]
    pub fn parsed_signature_algorithm(&self) -> SignatureAlgorithm {
        self.signature_algorithm
            .as_deref()
            .and_then(SignatureAlgorithm::from_name)
            .unwrap_or_default()
    }

    /// Parses the JSON-encoded authn context class ref list.
    ///
    /// Malformed JSON degrades to an empty list with a warning; it never
    /// fails the request being composed.
    #[must_use]
    pub fn authn_context_class_ref_uris(&self) -> Vec<String> {
        parse_ref_list(self.authn_context_class_refs.as_deref(), "AuthnContextClassRefs")
    }

    /// Parses the JSON-encoded authn context declaration ref list.
    #[must_use]
    pub fn authn_context_decl_ref_uris(&self) -> Vec<String> {
        parse_ref_list(self.authn_context_decl_refs.as_deref(), "AuthnContextDeclRefs")
    }

    /// Returns true if any RequestedAuthnContext input is configured.
    #[must_use]
    pub fn has_requested_authn_context(&self) -> bool {
        self.authn_context_comparison.is_some()
            || !self.authn_context_class_ref_uris().is_empty()
            || !self.authn_context_decl_ref_uris().is_empty()
    }

    /// Returns true if a single logout service URL is configured.
    #[must_use]
    pub fn has_single_logout_service(&self) -> bool {
        self.single_logout_service_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

fn parse_ref_list(json: Option<&str>, entry_name: &str) -> Vec<String> {
    let Some(json) = json.filter(|s| !s.is_empty()) else {
        return Vec::new();
    };

    match serde_json::from_str::<Vec<String>>(json) {
        Ok(refs) => refs,
        Err(e) => {
            tracing::warn!("Could not json-deserialize {entry_name} config entry '{json}': {e}");
            Vec::new()
        }
    }
}

/// Strategy for deriving the `<ds:KeyName>` value from the signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyNameTransformer {
    /// Do not emit a key name.
    None,
    /// Use the key id verbatim.
    #[default]
    KeyId,
    /// Use the certificate subject DN.
    CertSubject,
}

impl KeyNameTransformer {
    /// Derives the key name for the given key id and certificate.
    ///
    /// Returns `None` when no name should be emitted, including when the
    /// subject DN cannot be read from the certificate.
    #[must_use]
    pub fn key_name(self, kid: &str, certificate_der: Option<&[u8]>) -> Option<String> {
        match self {
            Self::None => None,
            Self::KeyId => Some(kid.to_string()),
            Self::CertSubject => certificate_der.and_then(cert_subject_dn),
        }
    }
}

/// Reads the subject DN out of a DER-encoded X.509 certificate.
fn cert_subject_dn(cert_der: &[u8]) -> Option<String> {
    use x509_parser::prelude::*;

    let (_, cert) = X509Certificate::from_der(cert_der).ok()?;
    Some(cert.subject().to_string())
}
