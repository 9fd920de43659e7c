//! Configuration for lead-enricher (`~/.config/lead-enricher/config.toml`).
//!
//! Holds the generative API endpoint settings and the saved-search store
//! settings. The API key is never stored here; it lives in the state dir and
//! is managed through `lea key`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::paths;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_MAX_LEADS: usize = 5;
pub const MAX_LEADS_CEILING: usize = 20;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_SESSIONS: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Generative API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// API root, without the `/models/...` suffix.
    pub base_url: String,
    pub model: String,
    /// Upper bound on candidate leads requested per search.
    pub max_leads: usize,
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_leads: DEFAULT_MAX_LEADS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Saved-search store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Oldest searches beyond this count are dropped on write.
    pub max_sessions: usize,
    /// Overrides the XDG state directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            state_dir: None,
        }
    }
}

impl StoreConfig {
    pub fn resolved_state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(paths::state_dir)
    }
}

impl LeaConfig {
    /// Load from the default location.
    ///
    /// Returns `Default` if the file does not exist or if the config
    /// directory cannot be determined (e.g., no HOME in containers).
    pub fn load() -> Result<Self> {
        match paths::config_file() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file absent, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gateway.base_url.trim().is_empty() {
            bail!("gateway.base_url must not be empty");
        }
        if self.gateway.model.trim().is_empty() {
            bail!("gateway.model must not be empty");
        }
        if !(1..=MAX_LEADS_CEILING).contains(&self.gateway.max_leads) {
            bail!(
                "gateway.max_leads must be between 1 and {MAX_LEADS_CEILING} (got {})",
                self.gateway.max_leads
            );
        }
        if self.gateway.request_timeout_secs == 0 {
            bail!("gateway.request_timeout_secs must be greater than 0");
        }
        if self.store.max_sessions == 0 {
            bail!("store.max_sessions must be at least 1");
        }
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        paths::config_file().context("Failed to determine config directory")
    }

    /// Default config TOML with comments, used by `lea config init`.
    pub fn default_template() -> String {
        format!(
            r#"# lead-enricher configuration
# Location: ~/.config/lead-enricher/config.toml
#
# The API key is not stored here. Use `lea key set` instead.

[gateway]
base_url = "{DEFAULT_BASE_URL}"
model = "{DEFAULT_MODEL}"
max_leads = {DEFAULT_MAX_LEADS}             # candidate companies per search (1-{MAX_LEADS_CEILING})
request_timeout_secs = {DEFAULT_REQUEST_TIMEOUT_SECS}

[store]
max_sessions = {DEFAULT_MAX_SESSIONS}         # saved searches kept, most recent first
# state_dir = "/path/to/state"
"#
        )
    }

    /// Write the default template, creating directories as needed.
    /// Refuses to overwrite an existing file.
    pub fn save_default_template(path: &Path) -> Result<()> {
        if path.exists() {
            bail!("Config already exists: {}", path.display());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(path, Self::default_template())
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}
