//! Layered settings
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! `pactum.{toml,yaml,json}` file (or an explicit path), then environment
//! variables such as `PACTUM__SERVER__PORT=9000`. A local `.env` file is
//! loaded into the environment before the sources are read.

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "PACTUM";

/// Top-level settings for a Pactum node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub registry: RegistrySettings,
    pub ledger: LedgerSettings,
    pub log: LogSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

/// Where escrow metadata gets indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryMode {
    /// In-process index served by this node
    Embedded,
    /// External registry service reached over HTTP
    Remote,
}

/// Registry sync settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    pub mode: RegistryMode,
    /// Base URL of the remote registry (required in remote mode)
    pub url: Option<String>,
    /// Base URL used when building shareable contract links
    pub public_base_url: String,
    /// Request timeout for remote registry calls
    pub timeout_secs: u64,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            mode: RegistryMode::Embedded,
            url: None,
            public_base_url: "http://127.0.0.1:8787".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Ledger settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LedgerSettings {
    /// Expose the mint endpoint (development and test networks only)
    pub allow_mint: bool,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional file, and the environment
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        dotenv::dotenv().ok();

        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("pactum").required(false),
        };

        let settings: Settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        debug!(?settings, "loaded settings");

        Ok(settings)
    }

    /// Reject combinations the node cannot run with
    pub fn validate(&self) -> CoreResult<()> {
        if self.server.port == 0 {
            return Err(CoreError::config("server.port must be non-zero"));
        }

        if self.registry.mode == RegistryMode::Remote {
            match self.registry.url.as_deref() {
                Some(url) if !url.trim().is_empty() => {}
                _ => {
                    return Err(CoreError::config(
                        "registry.url is required when registry.mode = remote",
                    ))
                }
            }
        }

        if self.registry.timeout_secs == 0 {
            return Err(CoreError::config("registry.timeout_secs must be non-zero"));
        }

        Ok(())
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
