//! Eventship configuration system.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, ShipError};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipperConfig {
    /// Collector URL batches are POSTed to.
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,
    /// Minimum spacing between the starts of non-retry sends.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: f64,
    /// Upper bound on a single HTTP request; expiry counts as a failed send.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub cooldown_policy: CooldownPolicy,
    /// Extra headers sent with every batch.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_endpoint_url() -> String { "https://example-url.com".into() }
fn default_cooldown_secs() -> f64 { 3.0 }
fn default_request_timeout_secs() -> u64 { 30 }

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            cooldown_secs: default_cooldown_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            cooldown_policy: CooldownPolicy::default(),
            headers: BTreeMap::new(),
            store: StoreConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl ShipperConfig {
    /// Load config from the default path (~/.eventship/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ShipError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ShipError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ShipError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the dispatcher cannot run with.
    pub fn validate(&self) -> Result<()> {
        let url = self.endpoint_url.trim();
        if url.is_empty() {
            return Err(ShipError::Config("endpoint_url must not be empty".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ShipError::Config(format!(
                "endpoint_url must be http(s): {url}"
            )));
        }
        if self.cooldown_secs <= 0.0 || Duration::try_from_secs_f64(self.cooldown_secs).is_err() {
            return Err(ShipError::Config(format!(
                "cooldown_secs must be a positive number of seconds, got {}",
                self.cooldown_secs
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ShipError::Config("request_timeout_secs must be > 0".into()));
        }
        self.store.validate()?;
        self.retry.validate()
    }

    /// Cooldown window. Out-of-range values saturate; `validate` rejects them.
    pub fn cooldown(&self) -> Duration {
        Duration::try_from_secs_f64(self.cooldown_secs).unwrap_or(Duration::MAX)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the eventship home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".eventship")
    }
}

/// What happens when a send starts while a cooldown is already running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownPolicy {
    /// Cancel the running window and start a new one: the window is measured
    /// from the most recent send start.
    #[default]
    Restart,
    /// Leave the running window alone: the window is measured from the first
    /// send start since the last expiry.
    KeepExisting,
}

/// Durable store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    File,
    Sqlite,
    /// Nothing survives a restart. Tests and throwaway processes only.
    Memory,
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Directory (file backend) or database file (sqlite backend).
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_pending_key")]
    pub pending_key: String,
    #[serde(default = "default_in_flight_key")]
    pub in_flight_key: String,
}

fn default_pending_key() -> String { "pending_events".into() }
fn default_in_flight_key() -> String { "in_flight_events".into() }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: None,
            pending_key: default_pending_key(),
            in_flight_key: default_in_flight_key(),
        }
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<()> {
        if self.pending_key.is_empty() || self.in_flight_key.is_empty() {
            return Err(ShipError::Config("store keys must not be empty".into()));
        }
        if self.pending_key == self.in_flight_key {
            return Err(ShipError::Config(format!(
                "pending_key and in_flight_key must differ (both '{}')",
                self.pending_key
            )));
        }
        Ok(())
    }

    /// Store location with `~` expanded, or the backend's default.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(p) => PathBuf::from(shellexpand::tilde(p).to_string()),
            None => match self.backend {
                StoreBackend::Sqlite => ShipperConfig::home_dir().join("state.db"),
                StoreBackend::File | StoreBackend::Memory => {
                    ShipperConfig::home_dir().join("state")
                }
            },
        }
    }
}

/// How long to wait before re-sending a failed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    /// Re-send at once, forever.
    #[default]
    Immediate,
    /// Double the delay on each consecutive failure, capped at `max_ms`.
    Exponential,
}

/// Retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub strategy: RetryStrategy,
    #[serde(default = "default_base_ms")]
    pub base_ms: u64,
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

fn default_base_ms() -> u64 { 500 }
fn default_max_ms() -> u64 { 60_000 }

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::default(),
            base_ms: default_base_ms(),
            max_ms: default_max_ms(),
        }
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<()> {
        if self.strategy == RetryStrategy::Exponential {
            if self.base_ms == 0 {
                return Err(ShipError::Config("retry.base_ms must be > 0".into()));
            }
            if self.max_ms < self.base_ms {
                return Err(ShipError::Config(format!(
                    "retry.max_ms ({}) must be >= retry.base_ms ({})",
                    self.max_ms, self.base_ms
                )));
            }
        }
        Ok(())
    }
}
