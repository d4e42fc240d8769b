//! ndh-relay: NeuroDrive 中继命令行工具
//!
//! Usage:
//!   ndh-relay process <simplify|summarize|analyze> [TEXT|-]
//!                                  Process text (stdin with `-` or no TEXT)
//!   ndh-relay settings get         Print effective settings
//!   ndh-relay settings set k=v...  Save settings
//!   ndh-relay health               Check the processing service
//!   ndh-relay serve                Answer NDJSON messages on stdin/stdout
//!   ndh-relay cache stats|clear    Inspect or empty the response cache

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use neurodrive_relay::relay::{serve_ndjson, ServeOptions};
use neurodrive_relay::{ApiClient, Mode, PartialSettings, RelayConfig, RelayController};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ndh-relay", author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// YAML configuration file
    #[arg(long, global = true, env = "NDH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simplify, summarize or analyze text
    Process {
        mode: Mode,
        /// Text to process; `-` or nothing reads stdin
        text: Option<String>,
    },
    /// Read or change user settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Query the processing service health endpoint
    Health,
    /// Answer newline-delimited JSON messages from stdin
    Serve,
    /// Response cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    Get,
    /// Save `key=value` pairs, e.g. `readingLevel=college bullets=false`
    Set {
        #[arg(required = true)]
        pairs: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    Stats,
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries results.
    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = RelayConfig::load(args.config.as_deref())
        .context("failed to load relay configuration")?;
    debug!(api_url = %config.api_url, "configuration loaded");

    match args.command {
        Command::Process { mode, text } => cmd_process(&config, mode, text).await,
        Command::Settings { action } => cmd_settings(&config, action).await,
        Command::Health => cmd_health(&config).await,
        Command::Serve => cmd_serve(&config).await,
        Command::Cache { action } => cmd_cache(&config, action).await,
    }
}

async fn cmd_process(config: &RelayConfig, mode: Mode, text: Option<String>) -> Result<()> {
    let text = match text.as_deref() {
        None | Some("-") => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
        Some(t) => t.to_string(),
    };
    let relay = RelayController::from_config(config)?;
    let envelope = relay.process(mode, &text).await;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    if !envelope.ok {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_settings(config: &RelayConfig, action: SettingsAction) -> Result<()> {
    let relay = RelayController::from_config(config)?;
    let settings = match action {
        SettingsAction::Get => relay.settings().get().await,
        SettingsAction::Set { pairs } => {
            let mut partial = PartialSettings::default();
            for pair in &pairs {
                let Some((key, value)) = pair.split_once('=') else {
                    bail!("expected key=value, got '{pair}'");
                };
                partial.apply_pair(key.trim(), value)?;
            }
            relay.settings().set(partial).await?
        }
    };
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

async fn cmd_health(config: &RelayConfig) -> Result<()> {
    let mut builder = ApiClient::builder()
        .base_url(&config.api_url)
        .timeout(config.timeout());
    if let Some(key) = &config.api_key {
        builder = builder.api_key(key);
    }
    let client = builder.build()?;
    let body = client
        .health()
        .await
        .with_context(|| format!("{} is not healthy", client.base_url()))?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn cmd_cache(config: &RelayConfig, action: CacheAction) -> Result<()> {
    let relay = RelayController::from_config(config)?;
    let cache = relay.cache();
    match action {
        CacheAction::Stats => {
            let report = serde_json::json!({
                "backend": cache.backend_name(),
                "entries": cache.len().await?,
                "dir": config.cache_dir()?,
                "session": cache.stats(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        CacheAction::Clear => {
            let removed = cache.len().await?;
            cache.clear().await?;
            info!(removed, "cache cleared");
            println!("removed {removed} entries");
        }
    }
    Ok(())
}

async fn cmd_serve(config: &RelayConfig) -> Result<()> {
    let relay = Arc::new(RelayController::from_config(config)?);
    serve_ndjson(
        relay,
        tokio::io::stdin(),
        tokio::io::stdout(),
        ServeOptions::from_config(config),
    )
    .await
    .context("serve stopped")
}
