//! The serve loop behind `taskitem host`

use std::{io, sync::Arc};

use anyhow::{Context, Result};
use taskitem_core::{boundary, Config, ItemContext};
use tracing::info;

/// Answer requests on stdin until shutdown or end of input.
///
/// # Errors
/// Returns an error if stdin or stdout fails
pub fn run(config: &Config) -> Result<()> {
    let context = Arc::new(ItemContext::from_config(config));
    info!(working_directory = ?context.working_directory(), "item host ready");

    let served = boundary::serve(io::stdin().lock(), io::stdout().lock(), &context)
        .context("Item host session failed")?;

    info!(served, "item host stopped");
    Ok(())
}
