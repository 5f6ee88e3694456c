//! Outgoing-message preprocessor chain.
//!
//! Hooks that run just before a composed message is handed to the
//! binding encoder. Each hook may replace the message outright, e.g. to
//! rewrite the destination of every request in a test environment. Hooks
//! run in registration order for both the login and logout paths.

use std::sync::Arc;

use idb_model::{AuthenticationSession, UserSession};

use crate::types::{AuthnRequest, LogoutRequest};

/// A hook invoked before an outgoing SAML message is sent.
///
/// Both methods default to the identity transformation, so an
/// implementation only overrides the path it cares about.
pub trait SamlPreprocessor: Send + Sync {
    /// Invoked with the composed AuthnRequest before it is encoded.
    fn before_sending_login_request(
        &self,
        request: AuthnRequest,
        _session: &AuthenticationSession,
    ) -> AuthnRequest {
        request
    }

    /// Invoked with the composed LogoutRequest before it is encoded.
    fn before_sending_logout_request(
        &self,
        request: LogoutRequest,
        _session: &UserSession,
    ) -> LogoutRequest {
        request
    }
}

/// An ordered list of preprocessors, fixed at startup.
#[derive(Clone, Default)]
pub struct PreprocessorChain {
    processors: Vec<Arc<dyn SamlPreprocessor>>,
}

impl PreprocessorChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a preprocessor; registration order is invocation order.
    #[must_use]
    pub fn register(mut self, preprocessor: Arc<dyn SamlPreprocessor>) -> Self {
        self.processors.push(preprocessor);
        self
    }

    /// Runs every login hook over the request, in order.
    #[must_use]
    pub fn apply_login(
        &self,
        mut request: AuthnRequest,
        session: &AuthenticationSession,
    ) -> AuthnRequest {
        for preprocessor in &self.processors {
            request = preprocessor.before_sending_login_request(request, session);
        }
        request
    }

    /// Runs every logout hook over the request, in order.
    #[must_use]
    pub fn apply_logout(&self, mut request: LogoutRequest, session: &UserSession) -> LogoutRequest {
        for preprocessor in &self.processors {
            request = preprocessor.before_sending_logout_request(request, session);
        }
        request
    }
}
