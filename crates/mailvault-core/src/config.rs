//! Archive configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! environment variables. The binary applies command-line flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Environment variable naming the archive root.
pub const ENV_ACCOUNTS_DIR: &str = "GYB_ACCOUNTS_DIR";
/// Environment variable overriding the store file name.
pub const ENV_STORE_FILE: &str = "MAILVAULT_STORE_FILE";
/// Environment variable overriding the per-file read timeout in milliseconds.
pub const ENV_READ_TIMEOUT_MS: &str = "MAILVAULT_READ_TIMEOUT_MS";
/// Environment variable overriding the default page size.
pub const ENV_PAGE_SIZE: &str = "MAILVAULT_PAGE_SIZE";

/// Store file name used by the archive exporter.
pub const DEFAULT_STORE_FILE: &str = "msg-db.sqlite";

/// Settings for locating and reading an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Directory holding one subdirectory per account.
    pub accounts_dir: PathBuf,
    /// Name of the store file inside each account directory.
    pub store_file: String,
    /// Upper bound for reading one raw message file.
    pub read_timeout_ms: u64,
    /// Page size used when a listing request does not name one.
    pub default_page_size: u32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            accounts_dir: PathBuf::from("./accounts"),
            store_file: DEFAULT_STORE_FILE.to_string(),
            read_timeout_ms: 5_000,
            default_page_size: 30,
        }
    }
}

impl ArchiveConfig {
    /// Creates a configuration rooted at `accounts_dir` with default settings.
    #[must_use]
    pub fn with_accounts_dir(accounts_dir: impl Into<PathBuf>) -> Self {
        Self {
            accounts_dir: accounts_dir.into(),
            ..Self::default()
        }
    }

    /// Default location of the configuration file, if the platform has one.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mailvault").join("config.json"))
    }

    /// Loads a configuration file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Loads the file at `path` when it exists, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Applies environment overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse.
    pub fn with_env(self) -> Result<Self> {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Applies environment overrides using `lookup` to read variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse.
    pub fn with_env_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_ACCOUNTS_DIR) {
            self.accounts_dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup(ENV_STORE_FILE) {
            self.store_file = file;
        }
        if let Some(raw) = lookup(ENV_READ_TIMEOUT_MS) {
            self.read_timeout_ms = parse_number(ENV_READ_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_PAGE_SIZE) {
            self.default_page_size = parse_number(ENV_PAGE_SIZE, &raw)?;
        }
        Ok(self)
    }

    /// Checks that every setting is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first bad setting.
    pub fn validate(&self) -> Result<()> {
        if self.store_file.trim().is_empty() {
            return Err(Error::Config("store_file must not be empty".into()));
        }
        if self.store_file.contains(['/', '\\']) {
            return Err(Error::Config(format!(
                "store_file must be a bare file name, got {}",
                self.store_file
            )));
        }
        if self.read_timeout_ms == 0 {
            return Err(Error::Config("read_timeout_ms must be positive".into()));
        }
        if self.default_page_size == 0 {
            return Err(Error::Config("default_page_size must be positive".into()));
        }
        Ok(())
    }

    /// Per-file read timeout as a [`Duration`].
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} must be a positive integer, got {raw:?}")))
}
