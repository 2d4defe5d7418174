//! Delete Command
//!
//! Removes a file from the connected bucket.

use crate::commands::CliSession;
use crate::symbols;
use anyhow::{Context, Result};
use console::style;
use gaia_client::DeleteOptions;
use gaia_core::error::GaiaError;

/// Delete configuration
pub struct DeleteConfig {
    /// Remote path in the bucket
    pub path: String,
    /// Also remove the .sig sidecar of a signed upload
    pub was_signed: bool,
    /// Treat a missing file as success
    pub ignore_missing: bool,
}

/// Run delete command
pub async fn run(session: &CliSession, config: DeleteConfig) -> Result<()> {
    let options = DeleteOptions {
        was_signed: config.was_signed,
    };

    match session.delete_file(&config.path, &options).await {
        Ok(()) => {
            println!("{} Deleted {}", style(symbols::CHECK).green(), config.path);
            Ok(())
        }
        Err(GaiaError::NotFound(_)) if config.ignore_missing => {
            println!(
                "{} {} was already gone",
                style(symbols::INFO).cyan(),
                config.path
            );
            Ok(())
        }
        Err(err) => Err(err).context("Failed to delete file"),
    }
}
