//! SAML 2.0 Service-Provider protocol engine for the idbroker identity
//! broker.
//!
//! This crate composes the outgoing half of the SAML 2.0 Web Browser SSO
//! profile, as seen from a brokering Service Provider:
//!
//! - **AuthnRequest / LogoutRequest composition** - Build protocol
//!   messages from provider configuration and session context
//! - **XML signature** - Sign protocol messages and SP metadata using
//!   XML-DSig with exclusive canonicalization
//! - **POST and Redirect bindings** - Encode messages into auto-submit
//!   forms or signed redirect URLs
//! - **SP metadata export** - Describe endpoints, bindings and key
//!   material for IdP trust configuration
//! - **Logout correlation** - Persist the federated NameID and session
//!   index at login so a matching logout can be issued later
//!
//! Parsing and validating *incoming* responses and assertions is the
//! inbound endpoint's job and lives outside this crate; the engine only
//! consumes the already-validated subject identifiers the endpoint hands
//! to [`provider::SamlBrokerProvider::authentication_finished`].
//!
//! # Architecture
//!
//! - [`types`] - Protocol message types, builders and SAML constants
//! - [`signature`] - XML-DSig signing
//! - [`bindings`] - POST and Redirect binding encoders
//! - [`config`] - Per-request provider configuration snapshot
//! - [`keys`] - Signing-key resolution and ordering
//! - [`correlation`] - Login/logout session correlation
//! - [`preprocessor`] - Outgoing-message hook chain
//! - [`metadata`] - SP metadata descriptor assembly
//! - [`logout`] - Logout flow selection and backchannel delivery
//! - [`provider`] - The broker provider facade tying it all together
//!
//! # SAML Specifications
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)
//! - [SAML 2.0 Metadata](https://docs.oasis-open.org/security/saml/v2.0/saml-metadata-2.0-os.pdf)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod config;
pub mod correlation;
pub mod error;
pub mod keys;
pub mod logout;
pub mod metadata;
pub mod preprocessor;
pub mod provider;
pub mod signature;
pub mod types;

pub use config::{KeyNameTransformer, ProviderConfig};
pub use error::{SamlError, SamlResult};
pub use provider::{AuthenticationRequest, SamlBrokerProvider, TransportArtifact};
pub use types::*;
