//! Connect Command
//!
//! Performs the hub challenge/token exchange and prints the resulting
//! bucket identity.

use crate::commands::CliSession;
use crate::symbols;
use anyhow::{Context, Result};
use console::style;

/// Run connect command
pub async fn run(session: &CliSession, hub_url: &str) -> Result<()> {
    let config = session
        .connect(hub_url, None, &[])
        .await
        .context("Failed to connect to hub")?;

    println!(
        "{} Connected to {}",
        style(symbols::CHECK).green(),
        style(&config.server).bold()
    );
    println!("  Address:  {}", config.address);
    println!("  Read URL: {}{}/", config.url_prefix, config.address);
    Ok(())
}
