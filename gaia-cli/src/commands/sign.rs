//! Sign Command
//!
//! Signs content with the app private key and prints the signature object.

use anyhow::{Context, Result};
use gaia_core::signature::sign_content;
use tokio::fs;

/// Sign configuration
pub struct SignConfig {
    /// Local file to sign; mutually exclusive with `content`
    pub file: Option<String>,
    /// Literal content to sign
    pub content: Option<String>,
}

/// Run sign command
pub async fn run(private_key: &str, config: SignConfig) -> Result<()> {
    let content = match (&config.file, &config.content) {
        (Some(file), None) => fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file))?,
        (None, Some(literal)) => literal.as_bytes().to_vec(),
        _ => anyhow::bail!("Provide exactly one of --file or --content"),
    };

    let signature = sign_content(&content, private_key).context("Failed to sign content")?;
    println!("{}", serde_json::to_string_pretty(&signature)?);
    Ok(())
}
