use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use fitx_utilization_proxy::refresh::RefreshHandle;
use fitx_utilization_proxy::server;
use fitx_utilization_proxy::store::{Store, StoreConfig};
use fitx_utilization_proxy::upstream::{FitxClient, UpstreamConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Directory holding the frontend build (index.html is the SPA fallback)
    #[arg(long, env = "STATIC_DIR", default_value = "./static")]
    static_dir: PathBuf,

    /// Value sent as x-public-facility-group to the FitX API
    #[arg(long, env = "FITX_FACILITY_GROUP", default_value = "")]
    facility_group: String,

    /// Value sent as x-tenant to the FitX API
    #[arg(long, env = "FITX_TENANT", default_value = "fitx")]
    tenant: String,

    /// Base URL of the FitX API
    #[arg(long, env = "FITX_UPSTREAM_URL", default_value = "https://mein.fitx.de")]
    upstream_url: String,

    /// Timeout for each upstream request
    #[arg(long, default_value_t = 5)]
    upstream_timeout_secs: u64,

    /// How long utilization snapshots are served from memory
    #[arg(long, default_value_t = 15 * 60)]
    cache_ttl_secs: u64,

    /// How often the studio list is reloaded
    #[arg(
        long,
        default_value_t = 6 * 60 * 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    refresh_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "fitx_utilization_proxy=info,tower_http=info".into()
            }),
        )
        .with_target(true)
        .init();

    if cli.facility_group.is_empty() {
        warn!("FITX_FACILITY_GROUP is not set, upstream requests will likely be rejected");
    }

    let upstream = UpstreamConfig::new(cli.facility_group)
        .with_base_url(cli.upstream_url)
        .with_tenant(cli.tenant)
        .with_timeout(Duration::from_secs(cli.upstream_timeout_secs));
    let client = FitxClient::new(upstream).context("failed to create upstream client")?;

    let config = StoreConfig {
        utilization_ttl: Duration::from_secs(cli.cache_ttl_secs),
        ..Default::default()
    };
    let store = Arc::new(Store::new(client, config).await);

    let refresh = RefreshHandle::spawn(
        store.clone(),
        Duration::from_secs(cli.refresh_interval_secs),
    );

    info!(static_dir = %cli.static_dir.display(), "starting server");
    let result = server::start_server(store, cli.static_dir, cli.port, shutdown_signal()).await;

    refresh.shutdown().await;
    result
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
