//! Saved-search history, most recent first.

use std::sync::Arc;

use anyhow::{Context, Result};
use lea_core::{AppError, Session};
use tracing::{debug, warn};

use crate::kv::KeyValueStore;

pub const SESSIONS_KEY: &str = "sessions.json";

/// In-memory mirror of the persisted history. Every mutation is written
/// through immediately.
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
    sessions: Vec<Session>,
    max_sessions: usize,
}

impl SessionStore {
    /// Read the persisted history. A payload that fails to parse is logged,
    /// deleted, and replaced by an empty history.
    pub fn load(kv: Arc<dyn KeyValueStore>, max_sessions: usize) -> Result<Self> {
        let max_sessions = max_sessions.max(1);
        let sessions = match kv.get(SESSIONS_KEY)? {
            None => Vec::new(),
            Some(raw) => match serde_json::from_str::<Vec<Session>>(&raw) {
                Ok(sessions) => sessions,
                Err(error) => {
                    warn!(%error, "saved searches are corrupt; discarding them");
                    if let Err(error) = kv.remove(SESSIONS_KEY) {
                        warn!(error = %format!("{error:#}"), "failed to delete corrupt saved searches");
                    }
                    Vec::new()
                }
            },
        };

        let mut store = Self {
            kv,
            sessions,
            max_sessions,
        };
        store.normalize();
        debug!(count = store.sessions.len(), "saved searches loaded");
        Ok(store)
    }

    /// Insert or replace by id, then persist.
    pub fn upsert(&mut self, session: Session) -> Result<()> {
        match self.sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session,
            None => self.sessions.push(session),
        }
        self.normalize();
        self.persist()
    }

    /// Returns whether a session was removed. Absent ids are a no-op.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let before = self.sessions.len();
        self.sessions.retain(|session| session.id != id);
        if self.sessions.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    pub fn list(&self) -> &[Session] {
        &self.sessions
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|session| session.id == id)
    }

    /// Exact id, else a unique case-insensitive id prefix.
    pub fn resolve(&self, prefix: &str) -> Result<&Session, AppError> {
        if let Some(session) = self.get(prefix) {
            return Ok(session);
        }
        let normalized = prefix.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(AppError::SearchNotFound(prefix.to_string()));
        }
        let mut matches = self
            .sessions
            .iter()
            .filter(|session| session.id.to_ascii_lowercase().starts_with(&normalized));
        match (matches.next(), matches.next()) {
            (Some(session), None) => Ok(session),
            (Some(_), Some(_)) => Err(AppError::AmbiguousSearchPrefix(prefix.to_string())),
            (None, _) => Err(AppError::SearchNotFound(prefix.to_string())),
        }
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    fn normalize(&mut self) {
        self.sessions
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.sessions.truncate(self.max_sessions);
    }

    fn persist(&self) -> Result<()> {
        let payload =
            serde_json::to_string(&self.sessions).context("failed to serialize saved searches")?;
        self.kv
            .set(SESSIONS_KEY, &payload)
            .context("failed to write saved searches")
    }
}
