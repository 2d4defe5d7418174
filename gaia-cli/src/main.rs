//! Gaia CLI
//!
//! Command-line client for Gaia storage hubs.
//!
//! # Commands
//! - `connect` - Verify hub connectivity and print the bucket identity
//! - `put` - Upload a file or literal content
//! - `get` - Download a file
//! - `delete` - Delete a file
//! - `ls` - List stored files
//! - `batch` - Execute a JSON batch descriptor
//! - `sign` - Sign content with the app private key
//! - `config` - Show or edit configuration
//!
//! # Configuration
//! Config file: ~/.gaia/config.toml

use anyhow::Result;
use clap::{Parser, Subcommand};
use gaia_client::{InMemorySessionStore, Session};

mod commands;
mod config;
mod symbols;

use commands::{batch, connect, delete, get, list, put, sign, CliSession};

#[derive(Parser)]
#[command(name = "gaia")]
#[command(about = "Gaia decentralized storage CLI")]
#[command(version)]
struct Cli {
    /// Hub URL (overrides config file)
    #[arg(long, global = true, env = "GAIA_HUB_URL")]
    hub: Option<String>,

    /// App private key, hex (overrides config file)
    #[arg(long, global = true, env = "GAIA_APP_PRIVATE_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify hub connectivity and print the bucket identity
    Connect,

    /// Upload a file or literal content
    Put {
        /// Remote path in the bucket
        path: String,

        /// Local file to upload
        #[arg(short, long)]
        file: Option<String>,

        /// Literal content to upload
        #[arg(short, long)]
        content: Option<String>,

        /// Encrypt to the app key before upload
        #[arg(short, long)]
        encrypt: bool,

        /// Sign the upload
        #[arg(short, long)]
        sign: bool,

        /// Content type header for the upload
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Download a file
    Get {
        /// Remote path in the bucket
        path: String,

        /// Decrypt with the app key
        #[arg(short, long)]
        decrypt: bool,

        /// Verify the upload's signature
        #[arg(short, long)]
        verify: bool,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Delete a file
    Delete {
        /// Remote path in the bucket
        path: String,

        /// Also remove the .sig sidecar of a signed upload
        #[arg(long)]
        was_signed: bool,

        /// Treat a missing file as success
        #[arg(long)]
        ignore_missing: bool,
    },

    /// List stored files
    Ls {
        /// Stop after this many entries
        #[arg(short, long)]
        limit: Option<u64>,
    },

    /// Execute a JSON batch descriptor of put/delete operations
    Batch {
        /// Path to the descriptor file
        descriptor: String,

        /// Base directory for file:// content references
        #[arg(short, long)]
        dir: Option<String>,
    },

    /// Sign content and print the signature object
    Sign {
        /// Local file to sign
        #[arg(short, long)]
        file: Option<String>,

        /// Literal content to sign
        #[arg(short, long)]
        content: Option<String>,
    },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Show config file path
    Path,

    /// Initialize config file with defaults
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (hub.url, identity.app_private_key)
        key: String,
        /// Value to set
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    // Load configuration from ~/.gaia/config.toml; CLI args override it
    let cfg = config::load_config();
    let hub_url = cli.hub.unwrap_or(cfg.hub.url.clone());
    let app_key = cli.key.or(cfg.identity.app_private_key.clone());

    match cli.command {
        Commands::Connect => {
            let session = signed_in_session(app_key)?;
            connect::run(&session, &hub_url).await?;
        }

        Commands::Put {
            path,
            file,
            content,
            encrypt,
            sign,
            content_type,
        } => {
            let session = connected_session(app_key, &hub_url).await?;
            put::run(
                &session,
                put::PutConfig {
                    path,
                    file,
                    content,
                    encrypt,
                    sign,
                    content_type,
                },
            )
            .await?;
        }

        Commands::Get {
            path,
            decrypt,
            verify,
            output,
        } => {
            let session = connected_session(app_key, &hub_url).await?;
            get::run(
                &session,
                get::GetConfig {
                    path,
                    decrypt,
                    verify,
                    output,
                },
            )
            .await?;
        }

        Commands::Delete {
            path,
            was_signed,
            ignore_missing,
        } => {
            let session = connected_session(app_key, &hub_url).await?;
            delete::run(
                &session,
                delete::DeleteConfig {
                    path,
                    was_signed,
                    ignore_missing,
                },
            )
            .await?;
        }

        Commands::Ls { limit } => {
            let session = connected_session(app_key, &hub_url).await?;
            list::run(&session, list::ListConfig { limit }).await?;
        }

        Commands::Batch { descriptor, dir } => {
            let session = connected_session(app_key, &hub_url).await?;
            batch::run(&session, batch::BatchConfig { descriptor, dir }).await?;
        }

        Commands::Sign { file, content } => {
            let key = require_key(app_key)?;
            sign::run(&key, sign::SignConfig { file, content }).await?;
        }

        Commands::Config { command } => {
            run_config_command(command, cfg)?;
        }
    }

    Ok(())
}

fn require_key(app_key: Option<String>) -> Result<String> {
    app_key.ok_or_else(|| {
        anyhow::anyhow!(
            "No app private key configured. Pass --key, set GAIA_APP_PRIVATE_KEY, \
             or run `gaia config set identity.app_private_key <hex>`"
        )
    })
}

fn signed_in_session(app_key: Option<String>) -> Result<CliSession> {
    let key = require_key(app_key)?;
    let store = InMemorySessionStore::new(serde_json::json!({
        "userData": { "appPrivateKey": key }
    }));
    Ok(Session::new(store))
}

async fn connected_session(app_key: Option<String>, hub_url: &str) -> Result<CliSession> {
    let session = signed_in_session(app_key)?;
    session.connect(hub_url, None, &[]).await?;
    Ok(session)
}

fn run_config_command(command: Option<ConfigCommands>, mut cfg: config::GaiaCliConfig) -> Result<()> {
    match command.unwrap_or(ConfigCommands::Show) {
        ConfigCommands::Show => {
            // Never echo the private key itself
            println!("hub.url = {}", cfg.hub.url);
            println!(
                "identity.app_private_key = {}",
                if cfg.identity.app_private_key.is_some() {
                    "(set)"
                } else {
                    "(unset)"
                }
            );
        }
        ConfigCommands::Path => {
            println!("{}", config::config_path().display());
        }
        ConfigCommands::Init { force } => {
            let path = config::config_path();
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            config::save_config(&config::GaiaCliConfig::default())?;
            println!("Initialized {}", path.display());
        }
        ConfigCommands::Set { key, value } => {
            config::set_value(&mut cfg, &key, &value)?;
            config::save_config(&cfg)?;
            println!("Set {}", key);
        }
    }
    Ok(())
}
