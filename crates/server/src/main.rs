use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mrcontent_core::{
    connect_bus, create_authenticator, load_config, validate_config, Authenticator, ContentStore,
    LogFormat, MessageBus, SqliteContentStore,
};
use mrcontent_server::{create_router, AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

async fn run() -> Result<()> {
    let config_path = std::env::var("MRCONTENT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // The log format lives in the config, so logging starts once it is read
    let loaded = load_config(&config_path);
    init_logging(
        loaded
            .as_ref()
            .map(|config| config.logging.format)
            .unwrap_or_default(),
    );

    info!("Loading configuration from {:?}", config_path);
    let config =
        loaded.with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!(version = VERSION, "Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);
    info!("Video dispatch: {:?}", config.processing.video_dispatch);

    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    let store: Arc<dyn ContentStore> = Arc::new(
        SqliteContentStore::new(&config.database.path)
            .context("Failed to create content store")?,
    );
    info!("Content store initialized");

    let bus = connect_bus(&config.bus).await;
    info!("Using message bus: {}", bus.name());

    let state = Arc::new(AppState::new(config.clone(), authenticator, store, bus));

    // Result workers stop when this fires
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let workers = state
        .ingestor()
        .start_subscriptions(state.bus(), &shutdown_tx)
        .await
        .context("Failed to subscribe to result topics")?;
    info!(workers = workers.len(), "Result subscriptions started");

    let app = create_router(Arc::clone(&state));

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if shutdown_tx.send(()).is_err() {
        warn!("No result workers were listening for shutdown");
    }

    for outcome in futures::future::join_all(workers).await {
        if let Err(e) = outcome {
            warn!(error = %e, "Result worker ended abnormally");
        }
    }
    info!(
        tracked = state.tracker().tracked_count(),
        "Result workers stopped"
    );

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
