//! Persistence for lead-enricher: a small key-value layer over the state
//! directory, the saved-search history, and the stored API key.

mod credential;
mod kv;
mod store;

pub use credential::{CREDENTIAL_KEY, CredentialStore};
pub use kv::{FileKvStore, KeyValueStore, MemoryKvStore};
pub use store::{SESSIONS_KEY, SessionStore};
