//! # Configuration
//!
//! [`Settings`] are read from a TOML file (`filmswap.toml` unless `--config`
//! names another), then overridden by `FILMSWAP_*` environment variables.
//!
//! | Variable                    | Field              |
//! |-----------------------------|--------------------|
//! | `FILMSWAP_DATABASE`         | `database`         |
//! | `FILMSWAP_API_KEY`          | `api_key`          |
//! | `FILMSWAP_HOST`             | `host`             |
//! | `FILMSWAP_PORT`             | `port`             |
//! | `FILMSWAP_BACKUP_DIR`       | `backup_dir`       |
//! | `FILMSWAP_PERIOD_POST_HOOK` | `period_post_hook` |
//! | `FILMSWAP_LOG_FORMAT`       | `log_format`       |
//! | `FILMSWAP_CORS_ORIGINS`     | `cors_origins`     |
//!
//! A missing file yields the defaults. A file that exists but does not parse
//! is a `ConfigError`.

use filmswap_core::{GraphLayout, SwapError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "filmswap.toml";

// =============================================================================
// SELECTORS
// =============================================================================

/// Where participants are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// ACID database file.
    #[default]
    Redb,
    /// Volatile; only useful for a throwaway server.
    Memory,
}

impl FromStr for Backend {
    type Err = SwapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redb" => Ok(Backend::Redb),
            "memory" => Ok(Backend::Memory),
            other => Err(SwapError::ConfigError(format!("unknown backend: {other}"))),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = SwapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(SwapError::ConfigError(format!("unknown log format: {other}"))),
        }
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Deployment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: PathBuf,
    pub backend: Backend,
    pub host: String,
    pub port: u16,
    /// Required as a Bearer token on `/admin/*` when set.
    pub api_key: Option<String>,
    pub backup_dir: PathBuf,
    /// Report letter and gift deliveries when the period changes.
    pub period_post_hook: bool,
    /// Refuse the `unmatch` recovery command.
    pub disable_unmatch: bool,
    pub default_layout: GraphLayout,
    pub log_format: LogFormat,
    /// Allowed CORS origins. Empty means localhost only, `"*"` allows all.
    pub cors_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("filmswap.db"),
            backend: Backend::Redb,
            host: "127.0.0.1".to_string(),
            port: 8080,
            api_key: None,
            backup_dir: PathBuf::from("backups"),
            period_post_hook: true,
            disable_unmatch: false,
            default_layout: GraphLayout::Spectral,
            log_format: LogFormat::Text,
            cors_origins: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (or [`DEFAULT_CONFIG_FILE`]) and the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, SwapError> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let mut settings = Self::from_file(path)?;
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Read a TOML file, falling back to defaults when it does not exist.
    pub fn from_file(path: &Path) -> Result<Self, SwapError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| SwapError::IoError(format!("Read {}: {}", path.display(), e)))?;
        Self::from_toml(&text)
            .map_err(|e| SwapError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, SwapError> {
        toml::from_str(text).map_err(|e| SwapError::ConfigError(e.to_string()))
    }

    /// Override fields from `FILMSWAP_*` variables returned by `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), SwapError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("FILMSWAP_DATABASE") {
            self.database = PathBuf::from(v);
        }
        if let Some(v) = get("FILMSWAP_API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = get("FILMSWAP_HOST") {
            self.host = v;
        }
        if let Some(v) = get("FILMSWAP_PORT") {
            self.port = v
                .trim()
                .parse()
                .map_err(|_| SwapError::ConfigError(format!("FILMSWAP_PORT is not a port: {v}")))?;
        }
        if let Some(v) = get("FILMSWAP_BACKUP_DIR") {
            self.backup_dir = PathBuf::from(v);
        }
        if let Some(v) = get("FILMSWAP_PERIOD_POST_HOOK") {
            self.period_post_hook = parse_flag("FILMSWAP_PERIOD_POST_HOOK", &v)?;
        }
        if let Some(v) = get("FILMSWAP_LOG_FORMAT") {
            self.log_format = v.parse()?;
        }
        if let Some(v) = get("FILMSWAP_CORS_ORIGINS") {
            self.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        Ok(())
    }

    /// The API key, ignoring an empty string.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }

    /// `host:port` for the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, SwapError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SwapError::ConfigError(format!("{key} is not a boolean: {value}"))),
    }
}

// =============================================================================
// TESTS
// =============================================================================
