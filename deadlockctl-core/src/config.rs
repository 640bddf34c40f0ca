//! Run configuration
//!
//! Resolved once at startup, read-only afterwards. Sources, highest priority
//! first:
//! 1. `DEADLOCKCTL_CONCURRENCY` / `DEADLOCKCTL_MAX_CONNECTIONS`
//! 2. `.env` in the current directory, then `~/.deadlockctl/.env`
//! 3. `$DEADLOCKCTL_CONFIG` or `~/.deadlockctl/config.toml`
//! 4. Built-in defaults
//!
//! The pool may not be smaller than the concurrency level: every worker must
//! be able to hold a connection at once.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DeadlockError, Result};

/// Workers fired per run
pub const DEFAULT_CONCURRENCY: usize = 30;

pub const CONCURRENCY_ENV: &str = "DEADLOCKCTL_CONCURRENCY";
pub const MAX_CONNECTIONS_ENV: &str = "DEADLOCKCTL_MAX_CONNECTIONS";
pub const CONFIG_PATH_ENV: &str = "DEADLOCKCTL_CONFIG";

/// Load `.env` files without overwriting variables already set.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded .env from current directory: {}", path.display());
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        if env_file.exists() {
            match dotenvy::from_path(&env_file) {
                Ok(()) => debug!("Loaded .env from {}", env_file.display()),
                Err(e) => debug!("Failed to load {}: {}", env_file.display(), e),
            }
        }
    }
}

/// The deadlockctl config directory (~/.deadlockctl)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".deadlockctl"))
}

/// On-disk TOML layout. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub simulator: SimulatorSection,

    #[serde(default)]
    pub pool: PoolSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulatorSection {
    #[serde(default)]
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolSection {
    /// Defaults to the concurrency level so every worker can hold a connection
    #[serde(default)]
    pub max_connections: Option<u32>,
}

impl ConfigFile {
    /// Read a config file. A missing file yields the defaults.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let file = toml::from_str(&contents).map_err(|e| DeadlockError::config_file(path, e))?;
        debug!("Loaded config from {}", path.display());
        Ok(file)
    }
}

/// Resolved, validated settings for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatorConfig {
    pub concurrency: NonZeroUsize,
    pub max_connections: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            concurrency: NonZeroUsize::new(DEFAULT_CONCURRENCY).unwrap_or(NonZeroUsize::MIN),
            max_connections: DEFAULT_CONCURRENCY as u32,
        }
    }
}

impl SimulatorConfig {
    /// Load from `.env`, the config file and the process environment.
    pub fn load() -> Result<Self> {
        load_dotenv();

        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .or_else(|| config_dir().map(|dir| dir.join("config.toml")));
        let file = match path {
            Some(path) => ConfigFile::read(&path)?,
            None => ConfigFile::default(),
        };

        let config = Self::resolve(&file, |key| std::env::var(key).ok())?;
        info!(
            concurrency = config.concurrency.get(),
            max_connections = config.max_connections,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Merge file values with environment lookups and validate.
    pub fn resolve<F>(file: &ConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let concurrency = match env(CONCURRENCY_ENV) {
            Some(raw) => parse_env::<usize>(CONCURRENCY_ENV, &raw)?,
            None => file.simulator.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
        };
        let concurrency = NonZeroUsize::new(concurrency)
            .ok_or_else(|| DeadlockError::config("concurrency must be at least 1"))?;

        let max_connections = match env(MAX_CONNECTIONS_ENV) {
            Some(raw) => Some(parse_env::<u32>(MAX_CONNECTIONS_ENV, &raw)?),
            None => file.pool.max_connections,
        };
        let max_connections = match max_connections {
            Some(n) => n,
            None => u32::try_from(concurrency.get()).unwrap_or(u32::MAX),
        };
        // Workers queued on the pool would hit sqlx's acquire timeout while
        // others sit in lock waits, masking the server's own detection.
        if (max_connections as usize) < concurrency.get() {
            return Err(DeadlockError::config(format!(
                "max_connections ({max_connections}) must be at least the concurrency level ({})",
                concurrency.get()
            )));
        }

        Ok(Self {
            concurrency,
            max_connections,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| DeadlockError::config(format!("{key} must be a non-negative integer, got '{raw}'")))
}
