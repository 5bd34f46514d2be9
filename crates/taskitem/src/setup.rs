//! Startup: configuration and logging

use std::path::PathBuf;

use anyhow::{Context, Result};
use taskitem_core::{load_config, Config};
use tracing_subscriber::EnvFilter;

/// Load configuration, letting `--working-dir` win over every other source.
///
/// # Errors
/// Returns an error if any configuration source is malformed
pub fn load(working_dir: Option<PathBuf>) -> Result<Config> {
    let mut config = load_config().context("Failed to load configuration")?;
    if working_dir.is_some() {
        config.working_dir = working_dir;
    }
    Ok(config)
}

/// Initialize tracing subscriber for logging
///
/// `RUST_LOG` takes precedence over the configured filter. Output goes to
/// stderr; stdout carries the protocol.
///
/// # Errors
/// Returns an error if the filter is invalid or a subscriber is already set
pub fn init_tracing(default_filter: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .with_context(|| format!("Invalid log filter '{default_filter}'"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {e}"))
}
