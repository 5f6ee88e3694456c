//! Signing-key resolution.
//!
//! Key material is fetched from the host key store at the moment it is
//! needed and never cached, so a rotation between two calls cannot mix
//! key snapshots within one message.

use idb_model::{KeyStatus, KeyStore, SigningKey};

use crate::error::SamlResult;

/// Fetches the realm's signing keys in metadata order.
///
/// Ordering rule: ACTIVE keys sort before PASSIVE keys; within equal
/// status, higher provider priority sorts first. Keys without a
/// certificate are unusable for SAML and are filtered out entirely.
pub async fn resolve_ordered_keys(
    store: &dyn KeyStore,
    realm: &str,
) -> SamlResult<Vec<SigningKey>> {
    let mut keys: Vec<SigningKey> = store
        .signing_keys(realm)
        .await?
        .into_iter()
        .filter(SigningKey::is_usable)
        .collect();

    keys.sort_by(|a, b| {
        status_rank(a.status)
            .cmp(&status_rank(b.status))
            .then(b.priority.cmp(&a.priority))
    });

    Ok(keys)
}

/// Fetches the realm's active signing key.
pub async fn active_key(store: &dyn KeyStore, realm: &str) -> SamlResult<SigningKey> {
    Ok(store.active_signing_key(realm).await?)
}

const fn status_rank(status: KeyStatus) -> u8 {
    match status {
        KeyStatus::Active => 0,
        KeyStatus::Passive => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use idb_model::KeyStoreError;

    struct FixedKeys(Vec<SigningKey>);

    #[async_trait]
    impl KeyStore for FixedKeys {
        async fn active_signing_key(&self, realm: &str) -> Result<SigningKey, KeyStoreError> {
            self.0
                .iter()
                .find(|k| k.status == KeyStatus::Active)
                .cloned()
                .ok_or_else(|| KeyStoreError::NoActiveKey(realm.to_string()))
        }

        async fn signing_keys(&self, _realm: &str) -> Result<Vec<SigningKey>, KeyStoreError> {
            Ok(self.0.clone())
        }
    }

    fn key(kid: &str, status: KeyStatus, priority: i64, with_cert: bool) -> SigningKey {
        SigningKey {
            kid: kid.to_string(),
            status,
            priority,
            certificate_pem: with_cert.then(|| {
                "-----BEGIN CERTIFICATE-----\nTUlJ\n-----END CERTIFICATE-----".to_string()
            }),
            public_key_der: vec![],
            private_key_der: vec![],
        }
    }

    #[tokio::test]
    async fn active_before_passive_then_priority_descending() {
        let store = FixedKeys(vec![
            key("A", KeyStatus::Active, 1, true),
            key("B", KeyStatus::Passive, 5, true),
            key("C", KeyStatus::Active, 3, true),
        ]);

        let ordered = resolve_ordered_keys(&store, "acme").await.unwrap();
        let kids: Vec<&str> = ordered.iter().map(|k| k.kid.as_str()).collect();
        assert_eq!(kids, ["C", "A", "B"]);
    }

    #[tokio::test]
    async fn keys_without_certificate_are_excluded() {
        let store = FixedKeys(vec![
            key("A", KeyStatus::Active, 9, false),
            key("B", KeyStatus::Passive, 1, true),
        ]);

        let ordered = resolve_ordered_keys(&store, "acme").await.unwrap();
        let kids: Vec<&str> = ordered.iter().map(|k| k.kid.as_str()).collect();
        assert_eq!(kids, ["B"]);
    }
}
