// Imagegate - Main Entry Point
//
// Boots the quota-gated image-generation gateway: loads configuration
// and the account provisioning file, wires the quota store, auth gate,
// and upstream client into the orchestrator, and serves the HTTP API
// until interrupted.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use imagegate::accounts::AccountStore;
use imagegate::auth::AuthGate;
use imagegate::config::{self, AppConfig};
use imagegate::orchestrator::Orchestrator;
use imagegate::quota::MemoryQuotaStore;
use imagegate::server::{self, AppState};
use imagegate::upstream::CogViewClient;

/// Quota-gated gateway for a paid image-generation provider
#[derive(Parser, Debug)]
#[command(name = "imagegate")]
#[command(version = "0.1.0")]
#[command(about = "Daily-quota gateway in front of an image-generation API", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Port to listen on (overrides IMAGEGATE_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to the JSON account provisioning file
    #[arg(long)]
    accounts: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(filter.into())
                .from_env_lossy(),
        )
        .init();

    let mut config = AppConfig::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }

    if config.upstream.api_key.is_empty() {
        warn!("IMAGEGATE_UPSTREAM_API_KEY is not set; upstream calls will be rejected");
    }

    let account_configs = match &args.accounts {
        Some(path) => config::load_accounts(path)?,
        None => {
            warn!("No accounts file given; only anonymous access is available");
            Vec::new()
        }
    };

    let accounts = Arc::new(AccountStore::from_configs(
        account_configs,
        config.quota.default_account_daily_limit,
    ));
    info!(
        accounts = accounts.len(),
        anonymous_limit = config.quota.anonymous_daily_limit,
        "Provisioning loaded"
    );

    let state = AppState {
        auth: Arc::new(AuthGate::new(accounts.clone())),
        orchestrator: Arc::new(Orchestrator::new(
            accounts,
            Arc::new(MemoryQuotaStore::new()),
            Arc::new(CogViewClient::new(config.upstream.clone())),
            config.quota.clone(),
        )),
    };

    info!("Imagegate v0.1.0 starting on port {}", config.port);

    server::serve(state, config.port, shutdown_signal()).await
}

/// Resolve on ctrl-c so in-flight requests can drain
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install ctrl-c handler: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
