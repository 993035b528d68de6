//! Runtime configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (applied by the binary)
//! 2. Values from a TOML file passed with `--config`
//! 3. Environment variables (`TRIAGE_*`)
//! 4. Built-in defaults
//!
//! | Variable                      | Default                             |
//! |-------------------------------|-------------------------------------|
//! | `TRIAGE_MODEL_URL`            | `http://localhost:8080/v1`          |
//! | `TRIAGE_MODEL_API_KEY`        | unset (rule classifier only)        |
//! | `TRIAGE_MODEL`                | `gpt-4o`                            |
//! | `TRIAGE_MODEL_MAX_TOKENS`     | `1000`                              |
//! | `TRIAGE_MODEL_TIMEOUT_SECS`   | `30`                                |
//! | `TRIAGE_WEBHOOK_URL`          | `https://hooks.example.com/ticket`  |
//! | `TRIAGE_WEBHOOK_TIMEOUT_SECS` | `30`                                |
//! | `TRIAGE_LOG_FILE`             | `agent_log.json`                    |
//! | `TRIAGE_ALERT_LIMIT`          | `10`                                |
//! | `TRIAGE_LOG_LEVEL`            | `info`                              |

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

const DEFAULT_MODEL_URL: &str = "http://localhost:8080/v1";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_MAX_TOKENS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_WEBHOOK_URL: &str = "https://hooks.example.com/ticket";
const DEFAULT_AUDIT_LOG: &str = "agent_log.json";
const DEFAULT_ALERT_LIMIT: usize = 10;
const DEFAULT_REBOOT_DELAY_MS: u64 = 1000;
const DEFAULT_NOTIFY_DELAY_MS: u64 = 500;
const DEFAULT_DEMO_ALERT_DELAY_MS: u64 = 1000;

const ENV_MODEL_URL: &str = "TRIAGE_MODEL_URL";
const ENV_MODEL_API_KEY: &str = "TRIAGE_MODEL_API_KEY";
const ENV_MODEL: &str = "TRIAGE_MODEL";
const ENV_MODEL_MAX_TOKENS: &str = "TRIAGE_MODEL_MAX_TOKENS";
const ENV_MODEL_TIMEOUT: &str = "TRIAGE_MODEL_TIMEOUT_SECS";
const ENV_WEBHOOK_URL: &str = "TRIAGE_WEBHOOK_URL";
const ENV_WEBHOOK_TIMEOUT: &str = "TRIAGE_WEBHOOK_TIMEOUT_SECS";
const ENV_LOG_FILE: &str = "TRIAGE_LOG_FILE";
const ENV_ALERT_LIMIT: &str = "TRIAGE_ALERT_LIMIT";
const ENV_LOG_LEVEL: &str = "TRIAGE_LOG_LEVEL";

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// OpenAI-compatible model endpoint used for classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    /// Empty means no model client is configured.
    pub api_key: String,
    pub model: String,
    /// Completion token budget per classification.
    pub max_tokens: u64,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: env_or(ENV_MODEL_URL, DEFAULT_MODEL_URL),
            api_key: env_or(ENV_MODEL_API_KEY, ""),
            model: env_or(ENV_MODEL, DEFAULT_MODEL),
            max_tokens: env_parse(ENV_MODEL_MAX_TOKENS, DEFAULT_MAX_TOKENS),
            timeout_secs: env_parse(ENV_MODEL_TIMEOUT, DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ModelConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Ticketing webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketingConfig {
    pub webhook_url: String,
    pub timeout_secs: u64,
}

impl Default for TicketingConfig {
    fn default() -> Self {
        Self {
            webhook_url: env_or(ENV_WEBHOOK_URL, DEFAULT_WEBHOOK_URL),
            timeout_secs: env_parse(ENV_WEBHOOK_TIMEOUT, DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Simulated effector latencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectorConfig {
    pub reboot_delay_ms: u64,
    pub notify_delay_ms: u64,
}

impl Default for EffectorConfig {
    fn default() -> Self {
        Self {
            reboot_delay_ms: DEFAULT_REBOOT_DELAY_MS,
            notify_delay_ms: DEFAULT_NOTIFY_DELAY_MS,
        }
    }
}

/// Top-level triage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub model: ModelConfig,
    pub ticketing: TicketingConfig,
    pub effectors: EffectorConfig,
    /// JSON Lines audit trail.
    pub audit_log: PathBuf,
    /// Maximum alerts fetched per session.
    pub alert_limit: usize,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Pause between alerts in demo mode.
    pub demo_alert_delay_ms: u64,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            ticketing: TicketingConfig::default(),
            effectors: EffectorConfig::default(),
            audit_log: PathBuf::from(env_or(ENV_LOG_FILE, DEFAULT_AUDIT_LOG)),
            alert_limit: env_parse(ENV_ALERT_LIMIT, DEFAULT_ALERT_LIMIT),
            log_level: env_or(ENV_LOG_LEVEL, "info"),
            demo_alert_delay_ms: DEFAULT_DEMO_ALERT_DELAY_MS,
        }
    }
}

impl TriageConfig {
    /// Load from a TOML file; keys absent from the file fall back to env/defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Check required settings. Outside demo mode a model API key is required.
    pub fn validate(&self, demo_mode: bool) -> Result<(), ConfigError> {
        if !demo_mode && !self.model.is_configured() {
            return Err(ConfigError::Missing(ENV_MODEL_API_KEY.to_string()));
        }
        let url = self.ticketing.webhook_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "ticketing.webhook_url".into(),
                message: format!("'{url}' is not an http(s) URL"),
            });
        }
        if self.alert_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "alert_limit".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.model.max_tokens == 0 {
            return Err(ConfigError::Invalid {
                key: "model.max_tokens".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Check if a model endpoint is reachable (GET /models).
pub async fn check_endpoint(url: &str) -> bool {
    let models_url = format!("{}/models", url.trim_end_matches('/'));
    match reqwest::Client::new()
        .get(&models_url)
        .timeout(std::time::Duration::from_secs(5))
        .send()
        .await
    {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}
