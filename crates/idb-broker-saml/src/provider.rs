//! The SAML broker provider facade.
//!
//! Ties the engine together for the host: composing and sending login
//! requests, capturing logout correlation when authentication finishes,
//! issuing front- and backchannel logouts, and exporting SP metadata.
//! Configuration, realm data and key material are snapshots fetched per
//! call; the provider holds no mutable state of its own.

use std::sync::Arc;

use idb_model::{client_notes, AuthenticationSession, KeyStore, RealmSnapshot, SessionNotes, SigningKey, UserSession};

use crate::bindings::Saml2BindingBuilder;
use crate::config::ProviderConfig;
use crate::correlation::{self, BrokeredAssertion};
use crate::error::{SamlError, SamlResult};
use crate::keys;
use crate::logout::{self, LogoutFlow};
use crate::metadata::SpDescriptor;
use crate::preprocessor::PreprocessorChain;
use crate::signature::{pem_to_der, SignatureConfig, XmlSigner};
use crate::types::{
    AuthnRequest, LogoutRequest, NameIdFormat, NameIdPolicy, RequestedAuthnContext, SamlBinding,
    SamlExtension,
};

/// Per-login context supplied by the host when a brokered login starts.
#[derive(Debug, Clone)]
pub struct AuthenticationRequest {
    /// The broker endpoint URL the IdP should send the response to.
    pub redirect_uri: String,

    /// Encoded client state, round-tripped through the IdP as
    /// RelayState.
    pub relay_state: String,

    /// The authentication session driving this login.
    pub auth_session: AuthenticationSession,
}

/// A binding-level artifact ready to hand to the browser.
#[derive(Debug, Clone)]
pub enum TransportArtifact {
    /// HTTP redirect to the given URL.
    Redirect {
        /// The redirect URL with SAML query parameters.
        url: String,
    },
    /// Auto-submitting HTML form.
    PostForm {
        /// The HTML page posting the SAML message.
        html: String,
    },
}

/// SAML service-provider-side broker for one external IdP.
pub struct SamlBrokerProvider {
    config: ProviderConfig,
    realm: RealmSnapshot,
    base_uri: String,
    key_store: Arc<dyn KeyStore>,
    session_notes: Arc<dyn SessionNotes>,
    preprocessors: PreprocessorChain,
    http: reqwest::Client,
}

impl SamlBrokerProvider {
    /// Creates a provider for the given configuration snapshot.
    #[must_use]
    pub fn new(
        config: ProviderConfig,
        realm: RealmSnapshot,
        base_uri: impl Into<String>,
        key_store: Arc<dyn KeyStore>,
        session_notes: Arc<dyn SessionNotes>,
    ) -> Self {
        Self {
            config,
            realm,
            base_uri: base_uri.into(),
            key_store,
            session_notes,
            preprocessors: PreprocessorChain::new(),
            http: reqwest::Client::new(),
        }
    }

    /// Installs the outgoing-message preprocessor chain.
    #[must_use]
    pub fn with_preprocessors(mut self, preprocessors: PreprocessorChain) -> Self {
        self.preprocessors = preprocessors;
        self
    }

    /// Replaces the HTTP client used for backchannel logout. The
    /// client's timeout policy bounds the blocking outbound call.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Returns the stored configuration snapshot this provider was
    /// created with.
    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// The SP entity id: the configured override when present and
    /// non-empty, otherwise derived from the realm.
    #[must_use]
    pub fn entity_id(&self) -> String {
        match self.config.entity_id.as_deref() {
            Some(entity_id) if !entity_id.is_empty() => entity_id.to_string(),
            _ => self.realm.entity_id(&self.base_uri),
        }
    }

    /// Composes, signs and encodes the AuthnRequest for a brokered
    /// login.
    ///
    /// # Errors
    ///
    /// Every composition or signing failure is wrapped into a single
    /// [`SamlError::RequestComposition`]; callers surface a generic
    /// broker failure and must not attempt partial recovery.
    pub async fn perform_login(
        &self,
        request: &AuthenticationRequest,
    ) -> SamlResult<TransportArtifact> {
        self.compose_login(request)
            .await
            .map_err(|e| SamlError::RequestComposition(e.to_string()))
    }

    async fn compose_login(&self, request: &AuthenticationRequest) -> SamlResult<TransportArtifact> {
        let config = &self.config;
        let mut destination = config.single_sign_on_service_url.clone();

        let name_id_format = config
            .name_id_policy_format
            .clone()
            .unwrap_or_else(|| NameIdFormat::Persistent.uri().to_string());

        let protocol_binding = if config.post_binding_response {
            SamlBinding::HttpPost
        } else {
            SamlBinding::HttpRedirect
        };

        let mut authn_request = AuthnRequest::new(self.entity_id())
            .with_destination(destination.clone())
            .with_acs_url(request.redirect_uri.as_str())
            .with_protocol_binding(protocol_binding.uri())
            .force_authn(config.force_authn)
            .with_name_id_policy(NameIdPolicy::with_format(name_id_format));

        if config.has_requested_authn_context() {
            authn_request = authn_request.with_requested_authn_context(RequestedAuthnContext {
                comparison: config.authn_context_comparison.unwrap_or_default(),
                class_refs: config.authn_context_class_ref_uris(),
                decl_refs: config.authn_context_decl_ref_uris(),
            });
        }

        if config.login_hint {
            if let Some(hint) = request.auth_session.client_note(client_notes::LOGIN_HINT) {
                authn_request = authn_request.with_subject(hint);
            }
        }

        authn_request = authn_request
            .add_extension(SamlExtension::SpType(Default::default()))
            .add_extension(SamlExtension::RequestedAttributes(Vec::new()));

        let mut binding = Saml2BindingBuilder::new().relay_state(request.relay_state.as_str());
        let post_binding = config.post_binding_authn_request;

        if config.want_authn_requests_signed {
            let key = keys::active_key(self.key_store.as_ref(), &self.realm.name).await?;
            let key_name = self.key_name_for(&key);
            binding = binding.sign_with(
                key_name.clone(),
                key.private_key_der.clone(),
                key.certificate_pem.as_deref(),
                config.parsed_signature_algorithm(),
            );
            // Only Redirect-bound requests carry the key hint extension;
            // the POST binding's embedded signature already names the key.
            if !post_binding && config.add_extensions_element_with_key_info {
                authn_request = authn_request.add_extension(SamlExtension::KeyInfo {
                    message_signing_key_id: key_name,
                });
            }
        }

        let authn_request = self
            .preprocessors
            .apply_login(authn_request, &request.auth_session);
        if let Some(ref rewritten) = authn_request.destination {
            destination = rewritten.clone();
        }

        let document = authn_request.to_document();
        if post_binding {
            Ok(TransportArtifact::PostForm {
                html: binding.post_binding(&document)?.request(&destination),
            })
        } else {
            Ok(TransportArtifact::Redirect {
                url: binding.redirect_binding(&document)?.request(&destination),
            })
        }
    }

    /// Captures logout correlation once the inbound endpoint has
    /// validated a login response.
    pub async fn authentication_finished(
        &self,
        auth_session: &AuthenticationSession,
        assertion: &BrokeredAssertion,
    ) -> SamlResult<()> {
        correlation::record_login(self.session_notes.as_ref(), auth_session.id, assertion).await
    }

    /// Sends a backchannel logout for the session, best-effort.
    ///
    /// A no-op unless an SLO URL is configured and the IdP supports the
    /// backchannel. Every failure past that point — missing correlation,
    /// signing trouble, transport errors, non-2xx/3xx statuses — is
    /// logged and swallowed so session termination always proceeds.
    pub async fn backchannel_logout(&self, user_session: &UserSession) -> SamlResult<()> {
        let Some(slo_url) = self.config.single_logout_service_url.as_deref() else {
            return Ok(());
        };
        if slo_url.trim().is_empty() || !self.config.backchannel_supported {
            return Ok(());
        }

        if let Err(e) = self.try_backchannel(user_session, slo_url).await {
            tracing::warn!("Failed saml backchannel broker logout to: {slo_url}: {e}");
        }
        Ok(())
    }

    async fn try_backchannel(&self, user_session: &UserSession, slo_url: &str) -> SamlResult<()> {
        let logout_request = self.build_logout_request(user_session, slo_url, &[]).await?;
        let destination = logout_request
            .destination
            .clone()
            .unwrap_or_else(|| slo_url.to_string());

        let binding = self.logout_binding(user_session).await?;
        let encoded = binding.post_binding(&logout_request.to_document())?;
        logout::send_backchannel_logout(
            &self.http,
            &destination,
            encoded.encoded(),
            &user_session.id.to_string(),
        )
        .await;
        Ok(())
    }

    /// Builds the browser-facing logout artifact for a broker-initiated
    /// logout.
    ///
    /// Returns `None` when no SLO URL is configured, and after
    /// dispatching over the backchannel when the IdP supports it. For
    /// front-channel flows a missing NameID correlation is fatal: no
    /// correlated logout request can be produced.
    pub async fn browser_initiated_logout(
        &self,
        user_session: &UserSession,
    ) -> SamlResult<Option<TransportArtifact>> {
        match logout::select_logout_flow(&self.config) {
            LogoutFlow::NoSloConfigured => Ok(None),
            LogoutFlow::Backchannel => {
                self.backchannel_logout(user_session).await?;
                Ok(None)
            }
            flow @ (LogoutFlow::FrontChannelPost | LogoutFlow::FrontChannelRedirect) => {
                let slo_url = self
                    .config
                    .single_logout_service_url
                    .clone()
                    .unwrap_or_default();

                let logout_request = self.build_logout_request(user_session, &slo_url, &[]).await?;
                if logout_request.name_id.is_none() {
                    return Err(SamlError::MissingCorrelation);
                }
                let destination = logout_request
                    .destination
                    .clone()
                    .unwrap_or_else(|| slo_url.clone());

                let binding = self.logout_binding(user_session).await?;
                let document = logout_request.to_document();
                let artifact = if flow == LogoutFlow::FrontChannelPost {
                    TransportArtifact::PostForm {
                        html: binding.post_binding(&document)?.request(&destination),
                    }
                } else {
                    TransportArtifact::Redirect {
                        url: binding.redirect_binding(&document)?.request(&destination),
                    }
                };
                Ok(Some(artifact))
            }
        }
    }

    /// Composes the logout request from stored correlation, appends any
    /// extra extensions and runs the logout preprocessors over it.
    ///
    /// Public so hosts with IdP-specific logout extensions can compose
    /// the request themselves before choosing a transport.
    pub async fn build_logout_request(
        &self,
        user_session: &UserSession,
        slo_url: &str,
        extensions: &[SamlExtension],
    ) -> SamlResult<LogoutRequest> {
        let correlation =
            correlation::load_for_logout(self.session_notes.as_ref(), user_session.id).await?;

        let mut logout_request = LogoutRequest::new(self.entity_id())
            .with_destination(slo_url)
            .assertion_expiration(self.realm.access_code_lifespan);
        if let Some(name_id) = correlation.name_id {
            logout_request = logout_request.with_name_id(name_id);
        }
        if let Some(session_index) = correlation.session_index {
            logout_request = logout_request.with_session_index(session_index);
        }
        for extension in extensions {
            logout_request = logout_request.add_extension(extension.clone());
        }

        Ok(self.preprocessors.apply_logout(logout_request, user_session))
    }

    /// Builds the binding for a logout request: relay state is the user
    /// session id, signing follows the same flag as login signing.
    async fn logout_binding(&self, user_session: &UserSession) -> SamlResult<Saml2BindingBuilder> {
        let mut binding = Saml2BindingBuilder::new().relay_state(user_session.id.to_string());
        if self.config.want_authn_requests_signed {
            let key = keys::active_key(self.key_store.as_ref(), &self.realm.name).await?;
            let key_name = self.key_name_for(&key);
            binding = binding.sign_with(
                key_name,
                key.private_key_der.clone(),
                key.certificate_pem.as_deref(),
                self.config.parsed_signature_algorithm(),
            );
        }
        Ok(binding)
    }

    /// Exports the SP metadata document, signing it when configured.
    ///
    /// # Errors
    ///
    /// Every failure is wrapped into [`SamlError::MetadataBuild`] and
    /// propagated; a broken descriptor must never be served.
    pub async fn export_metadata(&self) -> SamlResult<String> {
        self.compose_metadata()
            .await
            .map_err(|e| SamlError::MetadataBuild(e.to_string()))
    }

    async fn compose_metadata(&self) -> SamlResult<String> {
        let config = &self.config;

        let binding = if config.post_binding_authn_request {
            SamlBinding::HttpPost
        } else {
            SamlBinding::HttpRedirect
        };

        let endpoint = format!(
            "{}/realms/{}/broker/{}/endpoint",
            self.base_uri.trim_end_matches('/'),
            self.realm.name,
            config.alias
        );

        let signing_keys =
            keys::resolve_ordered_keys(self.key_store.as_ref(), &self.realm.name).await?;
        let encryption_keys: Vec<SigningKey> = signing_keys
            .iter()
            .filter(|key| key.status == idb_model::KeyStatus::Active)
            .cloned()
            .collect();

        let name_id_format = config
            .name_id_policy_format
            .clone()
            .unwrap_or_else(|| NameIdFormat::Persistent.uri().to_string());

        let (mut document, document_id) = SpDescriptor {
            entity_id: &self.entity_id(),
            binding,
            assertion_endpoint: &endpoint,
            logout_endpoint: &endpoint,
            want_authn_requests_signed: config.want_authn_requests_signed,
            want_assertions_signed: config.want_assertions_signed,
            want_assertions_encrypted: config.want_assertions_encrypted,
            name_id_format: &name_id_format,
            signing_keys: &signing_keys,
            encryption_keys: &encryption_keys,
        }
        .to_document();

        if config.sign_sp_metadata {
            let key = keys::active_key(self.key_store.as_ref(), &self.realm.name).await?;
            let key_name = self.key_name_for(&key);
            let certificate_der = key
                .certificate_pem
                .as_deref()
                .and_then(|pem| pem_to_der(pem, "CERTIFICATE"));
            let signer = XmlSigner::new(key.private_key_der.clone(), certificate_der)
                .with_key_name(key_name)
                .with_config(SignatureConfig::with_algorithm(
                    config.parsed_signature_algorithm(),
                ));
            document = signer.sign(&document, &document_id)?;
        }

        Ok(document)
    }

    /// Derives the `<ds:KeyName>` hint for a signing key.
    fn key_name_for(&self, key: &SigningKey) -> Option<String> {
        let certificate_der = key
            .certificate_pem
            .as_deref()
            .and_then(|pem| pem_to_der(pem, "CERTIFICATE"));
        self.config
            .key_name_transformer
            .key_name(&key.kid, certificate_der.as_deref())
    }
}
