//! Waypost server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use waypost_core::config::AppConfig;
use waypost_server::{AppState, create_router};

/// Waypost - web analytics ingestion server
#[derive(Parser, Debug)]
#[command(name = "waypostd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "WAYPOST_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Waypost v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (file is optional, env vars can provide/override everything)
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    let has_config_file = config_path.exists();

    if has_config_file {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    // Check for WAYPOST_ environment variables (excluding WAYPOST_CONFIG which is just the path)
    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with("WAYPOST_") && key != "WAYPOST_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: waypostd --config /path/to/config.toml\n  \
             2. Environment variables: WAYPOST_SERVER__BIND=0.0.0.0:3001 \
             WAYPOST_SERVER__BASE_URL=https://app.example.com waypostd\n\n\
             See config/server.example.toml for example configuration.\n\
             Set WAYPOST_CONFIG env var to specify a default config file path."
        );
    }

    if !has_config_file {
        tracing::info!("Using environment variables for configuration");
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("WAYPOST_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;

    // Initialize metadata store
    let metadata = waypost_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    tracing::info!("Metadata store initialized");

    // Verify store connectivity before accepting requests
    metadata
        .health_check()
        .await
        .context("metadata health check failed")?;
    tracing::info!("Metadata store connectivity verified");

    // Create application state (empty cache + static allow-list defaults)
    let state = AppState::new(config.clone(), metadata).context("failed to build server state")?;

    // Initial load. A failure here is logged, not fatal: the cache serves
    // fail-safe defaults and the allow list serves its static entries until
    // a later refresh (or the first request's lazy load) succeeds.
    match state.refresh().await {
        Ok(()) => {
            let stats = state.origins.stats();
            tracing::info!(
                sites = state.sites.len(),
                static_origins = stats.static_entries,
                dynamic_origins = stats.dynamic_entries,
                origin_patterns = stats.patterns,
                "Site cache and origin allow list loaded"
            );
        }
        Err(e) => {
            tracing::warn!(error = %e, "Initial cache load failed, serving defaults until refresh");
        }
    }

    // Spawn periodic refresh loop if enabled
    if config.server.auto_refresh_enabled {
        let state_clone = state.clone();
        let interval = config.server.refresh_interval();

        tokio::spawn(async move {
            tracing::info!(
                interval_secs = interval.as_secs(),
                "Periodic cache refresh enabled"
            );

            loop {
                tokio::time::sleep(interval).await;
                if let Err(e) = state_clone.refresh().await {
                    tracing::error!(error = %e, "Periodic cache refresh failed");
                }
            }
        });
    } else {
        tracing::info!("Periodic cache refresh disabled");
    }

    // Create router
    let app = create_router(state);

    // Parse bind address
    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
