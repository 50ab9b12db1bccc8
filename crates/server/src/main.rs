use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use moviezone_core::{
    config_path_from_env, create_authenticator, load_config, validate_config, Authenticator,
    Directory, JsonCatalog, JsonRequestStore, JsonTokenStore, RequestStore, SqliteTokenStore,
    TitleCatalog, TokenBackend, TokenStore,
};
use moviezone_server::api::create_router;
use moviezone_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("MovieZone v{}", VERSION);

    let config_path = config_path_from_env();

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Data directory: {:?}", config.storage.data_dir);

    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    let storage = &config.storage;

    let catalog: Arc<dyn TitleCatalog> = Arc::new(
        JsonCatalog::open(&storage.movies_path()).context("Failed to open title catalog")?,
    );
    info!("Title catalog initialized");

    let token_store: Arc<dyn TokenStore> = match storage.token_backend {
        TokenBackend::Json => Arc::new(
            JsonTokenStore::open(&storage.tokens_path()).context("Failed to open token store")?,
        ),
        TokenBackend::Sqlite => Arc::new(
            SqliteTokenStore::new(&storage.token_db_path())
                .context("Failed to open token database")?,
        ),
    };
    info!("Token store initialized ({:?})", storage.token_backend);

    let requests: Arc<dyn RequestStore> = Arc::new(
        JsonRequestStore::open(&storage.requests_path()).context("Failed to open request store")?,
    );
    let directory = Arc::new(
        Directory::open_in(config.bot.owner_id, storage).context("Failed to open directory")?,
    );
    info!("Request store and directory initialized");

    let addr = SocketAddr::new(config.server.host, config.server.port);

    let state = Arc::new(AppState::new(
        config,
        authenticator,
        catalog,
        token_store,
        requests,
        directory,
    ));

    state.sweeper().start().await;

    let app = create_router(Arc::clone(&state));

    // Start server
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Stopping token sweeper...");
    state.sweeper().stop().await;

    info!("Server shut down");
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
