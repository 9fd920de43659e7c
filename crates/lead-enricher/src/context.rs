//! Wiring from user configuration to a ready [`SessionController`].

use std::sync::Arc;

use anyhow::{Context, Result};
use lea_config::LeaConfig;
use lea_core::{Lead, LeadStatus};
use lea_gateway::{AiGateway, GeminiClientFactory};
use lea_pipeline::{ProgressListener, SessionController};
use lea_session::{CredentialStore, FileKvStore, KeyValueStore, SessionStore};

pub(crate) fn build_controller(
    config: &LeaConfig,
    listener: Option<Arc<dyn ProgressListener>>,
) -> Result<SessionController> {
    let state_dir = config.store.resolved_state_dir();
    tracing::debug!(state_dir = %state_dir.display(), "opening state directory");

    let kv: Arc<dyn KeyValueStore> = Arc::new(FileKvStore::new(&state_dir));
    let store = SessionStore::load(kv.clone(), config.store.max_sessions)
        .with_context(|| format!("Failed to open saved searches in {}", state_dir.display()))?;
    let factory = GeminiClientFactory::new(config.gateway.clone());
    let gateway = Arc::new(AiGateway::new(Arc::new(factory), config.gateway.max_leads));

    let controller = SessionController::new(gateway, store, CredentialStore::new(kv));
    Ok(match listener {
        Some(listener) => controller.with_listener(listener),
        None => controller,
    })
}

/// Load config and build a controller in one step.
pub(crate) fn open(listener: Option<Arc<dyn ProgressListener>>) -> Result<SessionController> {
    let config = LeaConfig::load()?;
    build_controller(&config, listener)
}

/// Prints one line per lead status change to stderr.
pub(crate) struct StderrProgress;

impl ProgressListener for StderrProgress {
    fn on_lead_update(&self, _session_id: &str, index: usize, lead: &Lead) {
        let note = match lead.status {
            LeadStatus::ErrorDetails | LeadStatus::ErrorEmail => {
                lead.error_message.as_deref().unwrap_or("failed")
            }
            _ => "",
        };
        if note.is_empty() {
            eprintln!("[{}] {}: {}", index + 1, lead.name, lead.status);
        } else {
            eprintln!("[{}] {}: {} ({note})", index + 1, lead.name, lead.status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lea_pipeline::Phase;

    #[test]
    fn test_build_controller_uses_configured_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LeaConfig::default();
        config.store.state_dir = Some(dir.path().join("state"));

        let controller = build_controller(&config, None).unwrap();
        let view = controller.bootstrap();
        assert_eq!(view.phase, Phase::AwaitingCredential);
        assert!(controller.saved_searches().is_empty());

        let view = controller.submit_credential("AIzaSyLocalKey9876").unwrap();
        assert_eq!(view.phase, Phase::Dashboard);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("state").join("credential")).unwrap(),
            "AIzaSyLocalKey9876"
        );
    }
}
