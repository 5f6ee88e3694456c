//! SP metadata descriptor assembly.
//!
//! Builds the `EntityDescriptor` document that external IdPs consume for
//! trust configuration: endpoints, bindings, NameID format and key
//! material. Wrong key material here silently breaks trust with peers,
//! so export failures always propagate (see the provider facade).

use idb_model::SigningKey;

use crate::types::{xml_escape, SamlBinding, SAML_METADATA_NS, XMLDSIG_NS};

/// Inputs for the SP descriptor document.
#[derive(Debug, Clone)]
pub struct SpDescriptor<'a> {
    /// SP entity id.
    pub entity_id: &'a str,

    /// Binding the IdP should use toward the SP endpoint.
    pub binding: SamlBinding,

    /// Assertion consumer endpoint URL.
    pub assertion_endpoint: &'a str,

    /// Single logout endpoint URL.
    pub logout_endpoint: &'a str,

    /// Whether this SP signs its authentication requests.
    pub want_authn_requests_signed: bool,

    /// Whether assertions must be signed.
    pub want_assertions_signed: bool,

    /// Whether assertions must be encrypted.
    pub want_assertions_encrypted: bool,

    /// NameID format advertised to the IdP.
    pub name_id_format: &'a str,

    /// Keys advertised for signature verification, in resolver order
    /// (every usable key, active and passive).
    pub signing_keys: &'a [SigningKey],

    /// Keys advertised for assertion encryption, in resolver order
    /// (active usable keys only).
    pub encryption_keys: &'a [SigningKey],
}

impl SpDescriptor<'_> {
    /// Renders the descriptor document.
    ///
    /// The root element carries an ID attribute so the document can be
    /// enveloped-signed afterwards; the returned id is the signature
    /// reference.
    #[must_use]
    pub fn to_document(&self) -> (String, String) {
        let id = format!("_id{}", uuid::Uuid::new_v4());

        let mut key_descriptors = String::new();
        for key in self.signing_keys {
            key_descriptors.push_str(&key_descriptor("signing", key));
        }
        if self.want_assertions_encrypted {
            for key in self.encryption_keys {
                key_descriptors.push_str(&key_descriptor("encryption", key));
            }
        }

        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<md:EntityDescriptor xmlns:md="{SAML_METADATA_NS}" ID="{id}" entityID="{entity_id}">
<md:SPSSODescriptor AuthnRequestsSigned="{requests_signed}" WantAssertionsSigned="{assertions_signed}" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
{key_descriptors}<md:SingleLogoutService Binding="{binding}" Location="{logout_endpoint}"/>
<md:NameIDFormat>{name_id_format}</md:NameIDFormat>
<md:AssertionConsumerService Binding="{binding}" Location="{assertion_endpoint}" index="1" isDefault="true"/>
</md:SPSSODescriptor>
</md:EntityDescriptor>"#,
            entity_id = xml_escape(self.entity_id),
            requests_signed = self.want_authn_requests_signed,
            assertions_signed = self.want_assertions_signed,
            binding = self.binding.uri(),
            logout_endpoint = xml_escape(self.logout_endpoint),
            name_id_format = xml_escape(self.name_id_format),
            assertion_endpoint = xml_escape(self.assertion_endpoint),
        );

        (document, id)
    }
}

/// Renders one `<md:KeyDescriptor>` with KeyName and certificate.
fn key_descriptor(key_use: &str, key: &SigningKey) -> String {
    let certificate_b64 = key.certificate_base64().unwrap_or_default();
    format!(
        r#"<md:KeyDescriptor use="{key_use}">
<ds:KeyInfo xmlns:ds="{XMLDSIG_NS}">
<ds:KeyName>{key_name}</ds:KeyName>
<ds:X509Data>
<ds:X509Certificate>{certificate_b64}</ds:X509Certificate>
</ds:X509Data>
</ds:KeyInfo>
</md:KeyDescriptor>
"#,
        key_name = xml_escape(&key.kid),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use idb_model::KeyStatus;

    fn key(kid: &str, status: KeyStatus) -> SigningKey {
        SigningKey {
            kid: kid.to_string(),
            status,
            priority: 0,
            certificate_pem: Some(
                "-----BEGIN CERTIFICATE-----\nTUlJQ2Zq\n-----END CERTIFICATE-----".to_string(),
            ),
            public_key_der: vec![],
            private_key_der: vec![],
        }
    }

    fn descriptor<'a>(signing: &'a [SigningKey], encryption: &'a [SigningKey]) -> SpDescriptor<'a> {
        SpDescriptor {
            entity_id: "https://broker.example.com/auth/realms/acme",
            binding: SamlBinding::HttpRedirect,
            assertion_endpoint: "https://broker.example.com/auth/realms/acme/broker/idp/endpoint",
            logout_endpoint: "https://broker.example.com/auth/realms/acme/broker/idp/endpoint",
            want_authn_requests_signed: true,
            want_assertions_signed: true,
            want_assertions_encrypted: false,
            name_id_format: "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent",
            signing_keys: signing,
            encryption_keys: encryption,
        }
    }

    #[test]
    fn document_contains_endpoints_and_flags() {
        let signing = [key("k1", KeyStatus::Active)];
        let (document, id) = descriptor(&signing, &[]).to_document();

        assert!(document.contains("entityID=\"https://broker.example.com/auth/realms/acme\""));
        assert!(document.contains(&format!("ID=\"{id}\"")));
        assert!(document.contains("AuthnRequestsSigned=\"true\""));
        assert!(document.contains("WantAssertionsSigned=\"true\""));
        assert!(document.contains("<md:SingleLogoutService"));
        assert!(document.contains("<md:AssertionConsumerService"));
        assert!(document.contains("nameid-format:persistent"));
        assert!(document.contains("HTTP-Redirect"));
    }

    #[test]
    fn signing_keys_rendered_in_order() {
        let signing = [key("newer", KeyStatus::Active), key("older", KeyStatus::Passive)];
        let (document, _) = descriptor(&signing, &[]).to_document();

        let newer = document.find("<ds:KeyName>newer</ds:KeyName>").unwrap();
        let older = document.find("<ds:KeyName>older</ds:KeyName>").unwrap();
        assert!(newer < older);
    }

    #[test]
    fn encryption_keys_only_when_encryption_wanted() {
        let signing = [key("k1", KeyStatus::Active)];
        let encryption = [key("k1", KeyStatus::Active)];

        let (document, _) = descriptor(&signing, &encryption).to_document();
        assert!(!document.contains("use=\"encryption\""));

        let mut with_encryption = descriptor(&signing, &encryption);
        with_encryption.want_assertions_encrypted = true;
        let (document, _) = with_encryption.to_document();
        assert!(document.contains("use=\"encryption\""));
    }
}
