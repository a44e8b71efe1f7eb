//! Configuration management

use std::{env, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before processing config.
    /// Loaded in order, later files override earlier. Variables are set into
    /// the process environment for `env:VAR` credential resolution.
    #[serde(default)]
    pub env_files: Vec<String>,
    /// SSRA authority configuration
    pub ssra: SsraConfig,
    /// Target gateway configuration
    pub gateway: GatewayTarget,
    /// Event stream configuration
    pub stream: StreamConfig,
}

/// SSRA authority configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SsraConfig {
    /// SSRA host. A bare hostname is reached over https; a full
    /// `http://host:port` origin is accepted for local relays.
    pub host: String,
    /// Account email (supports `env:VAR_NAME`)
    pub email: String,
    /// Account password (supports `env:VAR_NAME`)
    pub password: String,
}

impl SsraConfig {
    /// Resolve the account email (expand `env:VAR` indirection)
    #[must_use]
    pub fn resolve_email(&self) -> String {
        resolve_value(&self.email)
    }

    /// Resolve the account password (expand `env:VAR` indirection)
    #[must_use]
    pub fn resolve_password(&self) -> String {
        resolve_value(&self.password)
    }
}

/// Resolve a config value, expanding `env:VAR_NAME` from the environment.
/// Unset variables fall back to the literal value.
fn resolve_value(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix("env:") {
        env::var(var_name).unwrap_or_else(|_| value.to_string())
    } else {
        value.to_string()
    }
}

/// Target gateway selection
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GatewayTarget {
    /// Gateway display name as assigned in SSRA (exact, case-sensitive)
    pub name: String,
}

/// Event stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Message types to subscribe to on connect
    pub subscriptions: Vec<String>,
    /// How long to watch the stream before the process exits
    #[serde(with = "humantime_serde")]
    pub watch: Duration,
    /// Inbound event channel capacity
    pub buffer_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            // create/update/delete are CRUD actions; sensor_value fires on
            // sensor state changes; zone_control on zone level changes.
            subscriptions: vec![
                "create".to_string(),
                "update".to_string(),
                "delete".to_string(),
                "sensor_value".to_string(),
                "zone_control".to_string(),
            ],
            watch: Duration::from_secs(5),
            buffer_size: 100,
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        // Load from file if provided
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (LIGHTSOCK_ prefix)
        figment = figment.merge(Env::prefixed("LIGHTSOCK_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        // Load env files into process environment (before env: resolution)
        config.load_env_files();

        Ok(config)
    }

    /// Load environment files into the process environment.
    /// Files that don't exist are silently skipped.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let path = Path::new(path_str);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => {
                        tracing::info!("Loaded env file: {path_str}");
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load env file {path_str}: {e}");
                    }
                }
            } else {
                tracing::debug!("Env file not found (skipped): {path_str}");
            }
        }
    }

    /// Validate the SSRA fields every flow needs (host and credentials)
    pub fn validate_ssra(&self) -> Result<()> {
        if self.ssra.host.is_empty() {
            return Err(Error::Config("ssra.host is required".to_string()));
        }
        if self.ssra.email.is_empty() || self.ssra.password.is_empty() {
            return Err(Error::Config(
                "ssra.email and ssra.password are required".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate that the fields the connection flow needs are present
    pub fn validate(&self) -> Result<()> {
        self.validate_ssra()?;
        if self.gateway.name.is_empty() {
            return Err(Error::Config("gateway.name is required".to_string()));
        }
        Ok(())
    }
}
