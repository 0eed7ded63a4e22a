//! TOML-based configuration for the inference server.
//!
//! [`ServerConfig`] is the single source of truth for all runtime
//! settings. It can be loaded from a TOML file, overridden by CLI
//! arguments (see `main.rs`), or constructed from defaults for tests.
//!
//! # Serde default values
//!
//! Every field carries a `#[serde(default = "...")]` so a partial config
//! file (or no file at all) still produces a complete, working
//! configuration. Example file:
//!
//! ```toml
//! [network]
//! port = 1234
//! bind_address = "0.0.0.0"
//!
//! [inference]
//! score_threshold = 0.0
//! warmup_runs = 10
//!
//! [watchdog]
//! default_budget_secs = 5
//! inference_budget_secs = 20
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The bind address + port pair is not a valid socket address.
    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub watchdog: WatchdogConfig,
}

/// TCP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// TCP port the inference listener binds to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// IP address to bind to. `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Inference pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceConfig {
    /// Minimum score a prediction needs to be included in the response.
    /// `0.0` admits every non-negative score.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
    /// Number of throwaway engine invocations performed at startup so that
    /// reported latencies are not skewed by cold caches.
    #[serde(default = "default_warmup_runs")]
    pub warmup_runs: u32,
}

/// Task watchdog budgets, in seconds.
///
/// The host watchdog expects every task to check in within its budget.
/// Inference can legitimately exceed the default budget, so the worker
/// extends it for the duration of an engine invocation and restores it
/// afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchdogConfig {
    /// Liveness budget outside inference.
    #[serde(default = "default_watchdog_budget")]
    pub default_budget_secs: u64,
    /// Extended budget while an engine invocation is in flight.
    #[serde(default = "default_inference_budget")]
    pub inference_budget_secs: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

fn default_port() -> u16 {
    1234
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_score_threshold() -> f32 {
    0.0
}

fn default_warmup_runs() -> u32 {
    10
}

fn default_watchdog_budget() -> u64 {
    5
}

fn default_inference_budget() -> u64 {
    20
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            score_threshold: default_score_threshold(),
            warmup_runs: default_warmup_runs(),
        }
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            default_budget_secs: default_watchdog_budget(),
            inference_budget_secs: default_inference_budget(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            inference: InferenceConfig::default(),
            watchdog: WatchdogConfig::default(),
        }
    }
}

// ── Loading & derived values ──────────────────────────────────────────────────

impl ServerConfig {
    /// Loads a configuration from a TOML file.
    ///
    /// Missing fields fall back to their defaults, so a minimal file that
    /// only overrides the port is valid.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    /// The socket address the listener should bind.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBindAddress`] if the configured
    /// address/port pair does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let joined = format!("{}:{}", self.network.bind_address, self.network.port);
        joined
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(joined))
    }

    pub fn default_watchdog_budget(&self) -> Duration {
        Duration::from_secs(self.watchdog.default_budget_secs)
    }

    pub fn inference_watchdog_budget(&self) -> Duration {
        Duration::from_secs(self.watchdog.inference_budget_secs)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
