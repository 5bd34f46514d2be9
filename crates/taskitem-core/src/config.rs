//! Configuration loading
//!
//! # Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Config file: `$TASKITEM_CONFIG`, else `./taskitem.toml` when present
//! 3. Environment variables: `TASKITEM_*`
//!
//! # Example Config
//!
//! ```toml
//! working_dir = "/src/project"
//!
//! [boundary]
//! host_program = "/usr/local/bin/taskitem"
//! timeout_ms = 10000
//!
//! [log]
//! filter = "taskitem_core=debug"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "TASKITEM_CONFIG";

/// Config file looked up in the current directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "taskitem.toml";

const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Directory relative identities resolve against. `None` follows the
    /// process working directory.
    pub working_dir: Option<PathBuf>,
    pub boundary: BoundaryConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Item host executable used by process boundaries
    pub host_program: Option<PathBuf>,
    /// Longest wait for a single answer from the far side
    pub timeout_ms: u64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            host_program: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Default `EnvFilter` directive for binaries
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Load configuration from all sources.
///
/// # Errors
///
/// Returns error if the config file is malformed, an environment override
/// does not parse, or the merged result fails validation.
pub fn load_config() -> Result<Config> {
    let config = match config_file_path()? {
        Some(path) => load_toml_file(&path)?,
        None => Config::default(),
    };

    let config = config.apply_env_vars()?;
    config.validate()?;
    Ok(config)
}

/// The config file to read, if any.
fn config_file_path() -> Result<Option<PathBuf>> {
    if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
        return Ok(Some(PathBuf::from(explicit)));
    }

    let local = std::env::current_dir()
        .map(|dir| dir.join(DEFAULT_CONFIG_FILE))
        .map_err(|e| Error::io(format!("Failed to get current directory: {e}")))?;
    Ok(local.is_file().then_some(local))
}

/// Load a TOML file into a Config; missing keys take their defaults.
///
/// # Errors
///
/// Returns error if the file cannot be read or is malformed TOML.
pub fn load_toml_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("Failed to read config file {}: {e}", path.display())))?;

    toml::from_str(&content).map_err(|e| {
        Error::config(format!(
            "Failed to parse config file {}: {e}",
            path.display()
        ))
    })
}

impl Config {
    /// Apply `TASKITEM_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns error if an override has an unparseable value.
    pub fn apply_env_vars(mut self) -> Result<Self> {
        // TASKITEM_WORKING_DIR
        if let Ok(value) = std::env::var("TASKITEM_WORKING_DIR") {
            self.working_dir = if value.is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }

        // TASKITEM_HOST_PROGRAM
        if let Ok(value) = std::env::var("TASKITEM_HOST_PROGRAM") {
            self.boundary.host_program = Some(PathBuf::from(value));
        }

        // TASKITEM_BOUNDARY_TIMEOUT_MS
        if let Ok(value) = std::env::var("TASKITEM_BOUNDARY_TIMEOUT_MS") {
            self.boundary.timeout_ms = value.parse().map_err(|e| {
                Error::config(format!("Invalid TASKITEM_BOUNDARY_TIMEOUT_MS value: {e}"))
            })?;
        }

        // TASKITEM_LOG
        if let Ok(value) = std::env::var("TASKITEM_LOG") {
            self.log.filter = value;
        }

        Ok(self)
    }

    /// Reject values no component can work with.
    ///
    /// # Errors
    ///
    /// Returns error for a zero boundary timeout or an empty log filter.
    pub fn validate(&self) -> Result<()> {
        if self.boundary.timeout_ms == 0 {
            return Err(Error::config("boundary.timeout_ms must be greater than zero"));
        }
        if self.log.filter.trim().is_empty() {
            return Err(Error::config("log.filter cannot be empty"));
        }
        Ok(())
    }
}
