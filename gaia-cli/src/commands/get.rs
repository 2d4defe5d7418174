//! Get Command
//!
//! Downloads a file from the connected bucket, decrypting and verifying
//! on request.

use crate::commands::CliSession;
use crate::symbols;
use anyhow::{Context, Result};
use console::style;
use gaia_client::GetOptions;
use gaia_core::cipher::PlainContent;
use std::io::Write;
use tokio::fs;

/// Download configuration
pub struct GetConfig {
    /// Remote path in the bucket
    pub path: String,
    pub decrypt: bool,
    pub verify: bool,
    /// Write to this file instead of stdout
    pub output: Option<String>,
}

/// Run get command
pub async fn run(session: &CliSession, config: GetConfig) -> Result<()> {
    let options = GetOptions {
        decrypt: config.decrypt,
        verify: config.verify,
    };

    let content = session
        .get_file(&config.path, &options)
        .await
        .context("Failed to download file")?;

    match config.output {
        Some(output) => {
            fs::write(&output, content.as_bytes()).await?;
            println!(
                "{} Wrote {} ({} bytes)",
                style(symbols::CHECK).green(),
                output,
                content.as_bytes().len()
            );
        }
        None => match content {
            PlainContent::Text(text) => println!("{}", text),
            PlainContent::Binary(bytes) => {
                // Raw bytes go to stdout untouched; redirect to keep them
                std::io::stdout().write_all(&bytes)?;
            }
        },
    }
    Ok(())
}
