use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use smspit_server::{shutdown_signal, Server, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "smspit")]
#[command(version, about = "SMS capture server for development and testing")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Web UI / query API port
    #[arg(long)]
    web_port: Option<u16>,

    /// Capture API port
    #[arg(long)]
    api_port: Option<u16>,

    /// Enable the Twilio-compatible capture route
    #[arg(long)]
    twilio_compat: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    info!("📱 Starting SMSpit v{}", env!("CARGO_PKG_VERSION"));

    let mut config = ServerConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;

    if let Some(port) = cli.web_port {
        config.web_port = port;
    }
    if let Some(port) = cli.api_port {
        config.api_port = port;
    }
    if cli.twilio_compat {
        config.twilio_compat = true;
    }
    config.validate().context("Invalid configuration")?;

    match &config.config_path {
        Some(path) => info!("📋 Configuration loaded from {}", path.display()),
        None => info!("📋 Using default configuration"),
    }

    let server = Server::bind(config.clone())
        .await
        .context("Failed to start listeners")?;

    info!("🌐 Web UI: http://{}", server.web_addr()?);
    info!("📡 API: http://{}", server.api_addr()?);
    info!("  - Max messages: {}", config.max_messages);
    if config.twilio_compat {
        info!("  - Twilio compatibility mode enabled");
    }
    if config.auth_token().is_some() {
        info!("  - Authentication required");
    }
    info!("🚀 SMSpit ready!");

    server.run(shutdown_signal()).await?;

    info!("👋 SMSpit stopped");
    Ok(())
}
