//! # idb-model
//!
//! Domain model and host capability traits for the idbroker SAML engine.
//!
//! The SAML protocol engine never owns persistent state. Everything it
//! needs from the host — realm settings, signing keys, session notes — is
//! modelled here either as an immutable per-request snapshot or as a
//! narrow capability trait the host implements:
//!
//! - [`realm`] - Realm snapshot (name, access-code lifespan)
//! - [`keys`] - Signing-key metadata and the read-only [`keys::KeyStore`]
//! - [`session`] - Session snapshots and the [`session::SessionNotes`]
//!   note store

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod keys;
pub mod realm;
pub mod session;

pub use keys::{KeyStatus, KeyStore, KeyStoreError, SigningKey};
pub use realm::RealmSnapshot;
pub use session::{
    client_notes, AuthenticationSession, MemorySessionNotes, SessionNotes, SessionNotesError,
    UserSession,
};
