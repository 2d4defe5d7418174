//! Batch Command
//!
//! Executes a JSON batch descriptor of put/delete operations against the
//! connected bucket.

use crate::commands::CliSession;
use crate::symbols;
use anyhow::{Context, Result};
use console::style;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Batch configuration
pub struct BatchConfig {
    /// Path to the JSON descriptor file
    pub descriptor: String,
    /// Base directory for file:// content references
    pub dir: Option<String>,
}

/// Run batch command
pub async fn run(session: &CliSession, config: BatchConfig) -> Result<()> {
    let descriptor = fs::read_to_string(&config.descriptor)
        .await
        .with_context(|| format!("Failed to read {}", config.descriptor))?;

    // Default the content base dir to the descriptor's own directory
    let base_dir = match config.dir {
        Some(dir) => PathBuf::from(dir),
        None => Path::new(&config.descriptor)
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let count = session
        .perform_files(&descriptor, &base_dir)
        .await
        .context("Batch execution failed")?;

    println!(
        "{} Batch complete: {} operations",
        style(symbols::CHECK).green(),
        count
    );
    Ok(())
}
