//! # Coldreach — personal cold-outreach email campaigns
//!
//! Stores contacts, personalizes HTML templates with merge tokens,
//! sends them over an SMTP relay (resume attached), and dispatches
//! deferred sends on a cron trigger.
//!
//! Usage:
//!   coldreach                        # Start the gateway server
//!   coldreach serve --port 8080      # Custom port
//!   coldreach dispatch               # Run one dispatcher pass and exit

use anyhow::Result;
use clap::{Parser, Subcommand};
use coldreach_core::OutreachConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "coldreach",
    version,
    about = "📬 Coldreach — personal cold-outreach email campaigns"
)]
struct Cli {
    /// Path to config file (default: ~/.coldreach/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one dispatcher pass over due scheduled emails and exit
    Dispatch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "coldreach=debug,tower_http=debug"
    } else {
        "coldreach=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => {
            let path = shellexpand::tilde(path).to_string();
            OutreachConfig::load_from(std::path::Path::new(&path))?
        }
        None => OutreachConfig::load()?,
    };

    match cli.command.unwrap_or(Commands::Serve { host: None, port: None }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            coldreach_gateway::start(config).await
        }
        Commands::Dispatch => dispatch_once(config).await,
    }
}

/// One-shot dispatch, the same pass the cron endpoint runs.
async fn dispatch_once(config: OutreachConfig) -> Result<()> {
    let db_path = shellexpand::tilde(&config.storage.db_path).to_string();
    let db = coldreach_store::OutreachDb::open(std::path::Path::new(&db_path))?;
    let mailer = coldreach_mailer::SmtpMailer::new(config.smtp.clone())?;

    let report = coldreach_campaign::run_dispatch(&db, &mailer, chrono::Utc::now()).await?;
    tracing::info!(
        "{} ({} discarded, {} retained)",
        report.message(),
        report.discarded,
        report.retained
    );
    Ok(())
}
