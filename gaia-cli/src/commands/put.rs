//! Put Command
//!
//! Uploads a file or literal content to the connected bucket.

use crate::commands::CliSession;
use crate::symbols;
use anyhow::{Context, Result};
use console::style;
use gaia_client::PutOptions;
use gaia_core::cipher::PlainContent;
use std::path::Path;
use tokio::fs;

/// Upload configuration
pub struct PutConfig {
    /// Remote path in the bucket
    pub path: String,
    /// Local file to upload; mutually exclusive with `content`
    pub file: Option<String>,
    /// Literal content to upload
    pub content: Option<String>,
    pub encrypt: bool,
    pub sign: bool,
    pub content_type: Option<String>,
}

/// Run put command
pub async fn run(session: &CliSession, config: PutConfig) -> Result<()> {
    let content = match (&config.file, &config.content) {
        (Some(file), None) => {
            let path = Path::new(file);
            if !path.exists() {
                anyhow::bail!("File does not exist: {}", file);
            }
            let bytes = fs::read(path).await?;
            match String::from_utf8(bytes) {
                Ok(text) => PlainContent::Text(text),
                Err(err) => PlainContent::Binary(err.into_bytes()),
            }
        }
        (None, Some(literal)) => PlainContent::Text(literal.clone()),
        _ => anyhow::bail!("Provide exactly one of --file or --content"),
    };

    let options = PutOptions {
        encrypt: config.encrypt,
        sign: config.sign,
        content_type: config.content_type,
    };

    let url = session
        .put_file(&config.path, content, &options)
        .await
        .context("Failed to upload file")?;

    println!(
        "{} Uploaded {}{}",
        style(symbols::CHECK).green(),
        config.path,
        if config.encrypt { " (encrypted)" } else { "" }
    );
    println!("  URL: {}", url);
    Ok(())
}
