//! User configuration loading and validation (`~/.config/lead-enricher/config.toml`).

pub mod config;
pub mod paths;

pub use config::{GatewayConfig, LeaConfig, StoreConfig};
