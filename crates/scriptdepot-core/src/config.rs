//! Configuration resolution for `scriptdepot`.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Settings file (`--config` or `~/.config/scriptdepot/settings.json`)
//! 3. Environment variables (`SCRIPTDEPOT_*`)
//! 4. CLI arguments (highest priority, applied by the binary)
//!
//! The resolved value is handed to each component at construction; nothing
//! reads configuration from global state afterwards.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use scriptdepot_auth::DEFAULT_REPLAY_WINDOW_MS;

use crate::error::{Error, Result};

/// Development-only shared secret. Refused when running in production.
pub const DEV_HMAC_SECRET: &str = "dev-secret-change-me";

/// Minimum accepted length of the shared secret, in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(Error::Config(format!(
                "environment must be one of development, production, test (got {other:?})"
            ))),
        }
    }
}

/// Complete `scriptdepot` configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub environment: Environment,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: SocketAddr,
    pub request_timeout_secs: u64,
    pub max_body_bytes: usize,
    /// Allowed CORS origin, `*` for any.
    pub cors_origin: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            request_timeout_secs: 30,
            max_body_bytes: 10 * 1024 * 1024, // 10 MB
            cors_origin: "*".to_string(),
        }
    }
}

/// Request-signing settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub hmac_secret: String,
    pub replay_window_ms: u64,
    /// Require signatures on read-only endpoints too.
    pub sign_reads: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            hmac_secret: DEV_HMAC_SECRET.to_string(),
            replay_window_ms: DEFAULT_REPLAY_WINDOW_MS,
            sign_reads: false,
        }
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("hmac_secret", &"<redacted>")
            .field("replay_window_ms", &self.replay_window_ms)
            .field("sign_reads", &self.sign_reads)
            .finish()
    }
}

/// Where the database and snapshot artifacts live.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageSettings {
    pub database_path: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Check invariants that must hold before the server starts.
    pub fn validate(&self) -> Result<()> {
        if self.auth.hmac_secret.len() < MIN_SECRET_LEN {
            return Err(Error::Config(format!(
                "HMAC secret must be at least {MIN_SECRET_LEN} bytes long"
            )));
        }
        if self.auth.replay_window_ms == 0 {
            return Err(Error::Config("replay window must be non-zero".into()));
        }
        if self.environment == Environment::Production && self.auth.hmac_secret == DEV_HMAC_SECRET
        {
            return Err(Error::Config(
                "the development HMAC secret cannot be used in production".into(),
            ));
        }
        if self.server.max_body_bytes == 0 {
            return Err(Error::Config("max body size must be non-zero".into()));
        }
        Ok(())
    }

    /// Returns true when the built-in development secret is in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.auth.hmac_secret == DEV_HMAC_SECRET
    }

    /// Database file path, falling back to `~/.scriptdepot/depot.db`.
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| data_dir().join("depot.db"))
    }

    /// Snapshot artifact root, falling back to `~/.scriptdepot/backups`.
    pub fn backup_dir(&self) -> PathBuf {
        self.storage
            .backup_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("backups"))
    }
}

/// Load configuration with hierarchical resolution.
///
/// An explicit `path` must exist; the global settings file is optional.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(p) => load_config_file(p)?,
        None => match global_config_path() {
            Some(global) if global.exists() => load_config_file(&global)?,
            _ => Config::default(),
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("scriptdepot").join("settings.json"))
}

fn data_dir() -> PathBuf {
    dirs::home_dir().map_or_else(|| PathBuf::from("data"), |h| h.join(".scriptdepot"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Apply `SCRIPTDEPOT_*` overrides using `lookup` to read variables.
///
/// Unparseable values are logged and ignored.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    fn parsed<T: FromStr>(key: &str, val: &str) -> Option<T> {
        let out = val.parse().ok();
        if out.is_none() {
            warn!(key, value = val, "Ignoring unparseable environment override");
        }
        out
    }

    if let Some(val) = lookup("SCRIPTDEPOT_BIND_ADDR") {
        if let Some(addr) = parsed("SCRIPTDEPOT_BIND_ADDR", &val) {
            config.server.bind_addr = addr;
        }
    }
    if let Some(val) = lookup("SCRIPTDEPOT_REQUEST_TIMEOUT_SECS") {
        if let Some(n) = parsed("SCRIPTDEPOT_REQUEST_TIMEOUT_SECS", &val) {
            config.server.request_timeout_secs = n;
        }
    }
    if let Some(val) = lookup("SCRIPTDEPOT_MAX_BODY_BYTES") {
        if let Some(n) = parsed("SCRIPTDEPOT_MAX_BODY_BYTES", &val) {
            config.server.max_body_bytes = n;
        }
    }
    if let Some(val) = lookup("SCRIPTDEPOT_CORS_ORIGIN") {
        config.server.cors_origin = val;
    }
    if let Some(val) = lookup("SCRIPTDEPOT_HMAC_SECRET") {
        config.auth.hmac_secret = val;
    }
    if let Some(val) = lookup("SCRIPTDEPOT_REPLAY_WINDOW_MS") {
        if let Some(n) = parsed("SCRIPTDEPOT_REPLAY_WINDOW_MS", &val) {
            config.auth.replay_window_ms = n;
        }
    }
    if let Some(val) = lookup("SCRIPTDEPOT_SIGN_READS") {
        if let Some(b) = parsed("SCRIPTDEPOT_SIGN_READS", &val) {
            config.auth.sign_reads = b;
        }
    }
    if let Some(val) = lookup("SCRIPTDEPOT_DB_PATH") {
        config.storage.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("SCRIPTDEPOT_BACKUP_DIR") {
        config.storage.backup_dir = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("SCRIPTDEPOT_LOG_LEVEL") {
        config.logging.level = val;
    }
    if let Some(val) = lookup("SCRIPTDEPOT_LOG_JSON") {
        if let Some(b) = parsed("SCRIPTDEPOT_LOG_JSON", &val) {
            config.logging.json = b;
        }
    }
    if let Some(val) = lookup("SCRIPTDEPOT_ENV") {
        if let Some(env) = parsed("SCRIPTDEPOT_ENV", &val) {
            config.environment = env;
        }
    }
}
