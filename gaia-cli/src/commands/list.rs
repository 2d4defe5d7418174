//! List Command
//!
//! Lists files stored in the connected bucket.

use crate::commands::CliSession;
use anyhow::{Context, Result};
use console::style;

/// List configuration
pub struct ListConfig {
    /// Stop after this many entries
    pub limit: Option<u64>,
}

/// Run list command
pub async fn run(session: &CliSession, config: ListConfig) -> Result<()> {
    let limit = config.limit.unwrap_or(u64::MAX);
    let mut printed = 0u64;

    let count = session
        .list_files(|entry| {
            println!("{}", entry);
            printed += 1;
            printed < limit
        })
        .await
        .context("Failed to list files")?;

    if count == 0 {
        println!("{} Bucket is empty", style("Info:").cyan());
    } else {
        println!("{} {} files", style("Total:").bold(), count);
    }
    Ok(())
}
