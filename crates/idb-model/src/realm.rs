//! Realm snapshot.
//!
//! A realm is the isolation unit of the broker: every login, logout and
//! metadata export happens within one realm. The engine only ever sees an
//! immutable snapshot taken at the start of the request.

use serde::{Deserialize, Serialize};

/// Immutable realm data consumed by the SAML engine.
///
/// Fetched fresh for every request; never cached across calls, so a
/// configuration change between two requests cannot produce a message
/// that mixes old and new settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmSnapshot {
    /// Realm name, used to derive the default SP entity id
    /// (`{base}/realms/{name}`).
    pub name: String,

    /// Access-code lifespan in seconds. Logout requests use this as the
    /// assertion validity window (`NotOnOrAfter`).
    pub access_code_lifespan: u32,
}

impl RealmSnapshot {
    /// Creates a realm snapshot with the default access-code lifespan.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            access_code_lifespan: 60,
        }
    }

    /// Returns the realm-derived SP entity id for the given base URI.
    #[must_use]
    pub fn entity_id(&self, base_uri: &str) -> String {
        format!("{}/realms/{}", base_uri.trim_end_matches('/'), self.name)
    }
}
