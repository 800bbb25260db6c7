//! Daemon settings: built-in defaults, then an optional TOML file, then `SIGNAL__*` env vars

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use signal_api_rpc::RpcServerConfig;
use signal_core::application::delta::validate_tracked_fields;
use signal_core::application::{GateConfig, OrchestratorConfig};
use signal_core::port::MaintenanceConfig;
use signal_infra_http::{DiscoveryConfig, LlmConfig, ProbesConfig};
use std::collections::HashMap;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "~/.signal/config.toml";
const DEFAULT_DB_PATH: &str = "~/.signal/signal.db";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite file path (`~` expanded) or a full `sqlite:` URL
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: DEFAULT_DB_PATH.to_string(),
        }
    }
}

impl DatabaseSettings {
    pub fn url(&self) -> String {
        if self.path.starts_with("sqlite:") {
            self.path.clone()
        } else {
            format!("sqlite://{}", shellexpand::tilde(&self.path))
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub rpc: RpcServerConfig,
    pub gate: GateConfig,
    pub orchestrator: OrchestratorConfig,
    pub probes: ProbesConfig,
    pub llm: LlmConfig,
    pub discovery: DiscoveryConfig,
    pub maintenance: MaintenanceConfig,
}

impl Settings {
    /// Load from `SIGNAL_CONFIG` (or the default path) and the process environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("SIGNAL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&shellexpand::tilde(&path), None)
    }

    /// `env` replaces the process environment when given
    pub fn load_from(path: &str, env: Option<HashMap<String, String>>) -> Result<Self> {
        let environment = Environment::with_prefix("SIGNAL")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("gate.api_keys")
            .with_list_parse_key("orchestrator.disabled_probes")
            .with_list_parse_key("orchestrator.tracked_fields")
            .source(env);

        let settings: Settings = Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?
            .try_deserialize()
            .context("Invalid configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        validate_tracked_fields(&self.orchestrator.tracked_fields)
            .context("orchestrator.tracked_fields")?;
        if self.gate.api_keys.is_empty() {
            warn!("gate.api_keys is empty: every request will be rejected");
        }
        if self.gate.requests_per_window == 0 || self.gate.window_secs == 0 {
            anyhow::bail!("gate.requests_per_window and gate.window_secs must be positive");
        }
        if self.orchestrator.max_parallel_probes == 0 || self.orchestrator.max_concurrent_jobs == 0 {
            anyhow::bail!("orchestrator concurrency limits must be positive");
        }
        Ok(())
    }
}
