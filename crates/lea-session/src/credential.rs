use std::sync::Arc;

use anyhow::Result;
use lea_core::Credential;

use crate::kv::KeyValueStore;

pub const CREDENTIAL_KEY: &str = "credential";

/// The single persisted API key.
#[derive(Clone)]
pub struct CredentialStore {
    kv: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// A stored value that is blank after trimming counts as absent.
    pub fn load(&self) -> Result<Option<Credential>> {
        Ok(self
            .kv
            .get(CREDENTIAL_KEY)?
            .map(|raw| Credential::new(raw.trim()))
            .filter(|credential| !credential.is_blank()))
    }

    pub fn save(&self, credential: &Credential) -> Result<()> {
        self.kv.set(CREDENTIAL_KEY, credential.expose().trim())
    }

    pub fn clear(&self) -> Result<()> {
        self.kv.remove(CREDENTIAL_KEY)
    }
}
