//! Login/logout session correlation.
//!
//! When a brokered login completes, the subject NameID and the IdP's
//! session index are written into the session note store. They are read
//! back exactly once, when a logout for that session has to be issued.
//! Either value may be absent; an absent NameID makes front-channel
//! logout impossible while backchannel logout proceeds best-effort.

use idb_model::SessionNotes;
use uuid::Uuid;

use crate::error::SamlResult;
use crate::types::NameId;

/// Session note keys used for logout correlation.
pub mod notes {
    /// Serialized federated subject NameID.
    pub const SAML_FEDERATED_SUBJECT_NAMEID: &str = "SAML_FEDERATED_SUBJECT_NAMEID";

    /// Federated authentication session index.
    pub const SAML_FEDERATED_SESSION_INDEX: &str = "SAML_FEDERATED_SESSION_INDEX";
}

/// The validated pieces of an inbound login the engine consumes.
///
/// Produced by the inbound endpoint after it has parsed and
/// cryptographically validated the SAML Response; the engine itself
/// never sees the raw assertion.
#[derive(Debug, Clone)]
pub struct BrokeredAssertion {
    /// The asserted subject's base identifier, when the subject carried
    /// one.
    pub subject_name_id: Option<NameId>,

    /// The authentication statement's session index, when present.
    pub session_index: Option<String>,
}

/// Correlation state recovered at logout time.
#[derive(Debug, Clone)]
pub struct SessionCorrelation {
    /// The federated NameID stored at login, if any.
    pub name_id: Option<NameId>,

    /// The session index stored at login, if any.
    pub session_index: Option<String>,
}

/// Records logout correlation when a brokered login completes.
///
/// Each axis is written only when the assertion carried it; a missing
/// value is not an error, it just means the later logout cannot be
/// correlated on that axis.
pub async fn record_login(
    store: &dyn SessionNotes,
    session_id: Uuid,
    assertion: &BrokeredAssertion,
) -> SamlResult<()> {
    if let Some(ref name_id) = assertion.subject_name_id {
        store
            .set_note(
                session_id,
                notes::SAML_FEDERATED_SUBJECT_NAMEID,
                &name_id.serialize_as_string(),
            )
            .await?;
    }

    if let Some(ref session_index) = assertion.session_index {
        store
            .set_note(session_id, notes::SAML_FEDERATED_SESSION_INDEX, session_index)
            .await?;
    }

    Ok(())
}

/// Recovers logout correlation for a session.
///
/// A stored NameID that fails to deserialize is treated the same as an
/// absent one; the caller decides whether that is fatal.
pub async fn load_for_logout(
    store: &dyn SessionNotes,
    session_id: Uuid,
) -> SamlResult<SessionCorrelation> {
    let name_id = store
        .get_note(session_id, notes::SAML_FEDERATED_SUBJECT_NAMEID)
        .await?
        .and_then(|serialized| match NameId::deserialize_from_string(&serialized) {
            Ok(name_id) => Some(name_id),
            Err(e) => {
                tracing::warn!("Stored federated NameID is unreadable: {e}");
                None
            }
        });

    let session_index = store
        .get_note(session_id, notes::SAML_FEDERATED_SESSION_INDEX)
        .await?;

    Ok(SessionCorrelation {
        name_id,
        session_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use idb_model::MemorySessionNotes;

    #[tokio::test]
    async fn full_correlation_roundtrip() {
        let store = MemorySessionNotes::new();
        let session_id = Uuid::new_v4();
        let name_id = NameId::persistent("subject-1").with_name_qualifier("https://idp.example.com");

        record_login(
            &store,
            session_id,
            &BrokeredAssertion {
                subject_name_id: Some(name_id.clone()),
                session_index: Some("_idx1".to_string()),
            },
        )
        .await
        .unwrap();

        let correlation = load_for_logout(&store, session_id).await.unwrap();
        assert_eq!(correlation.name_id, Some(name_id));
        assert_eq!(correlation.session_index.as_deref(), Some("_idx1"));
    }

    #[tokio::test]
    async fn missing_axes_are_not_errors() {
        let store = MemorySessionNotes::new();
        let session_id = Uuid::new_v4();

        record_login(
            &store,
            session_id,
            &BrokeredAssertion {
                subject_name_id: None,
                session_index: None,
            },
        )
        .await
        .unwrap();

        let correlation = load_for_logout(&store, session_id).await.unwrap();
        assert!(correlation.name_id.is_none());
        assert!(correlation.session_index.is_none());
    }

    #[tokio::test]
    async fn session_index_alone_is_preserved() {
        let store = MemorySessionNotes::new();
        let session_id = Uuid::new_v4();

        record_login(
            &store,
            session_id,
            &BrokeredAssertion {
                subject_name_id: None,
                session_index: Some("_only-index".to_string()),
            },
        )
        .await
        .unwrap();

        let correlation = load_for_logout(&store, session_id).await.unwrap();
        assert!(correlation.name_id.is_none());
        assert_eq!(correlation.session_index.as_deref(), Some("_only-index"));
    }
}
