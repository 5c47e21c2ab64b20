//! Minh Phat API server.
//!
//! Serves the REST API on `MINHPHAT_HOST:MINHPHAT_PORT` over either the
//! in-memory store or a SQLite file, selected by `MINHPHAT_STORE`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use minh_phat_server::{
    app,
    config::{ServerConfig, StoreKind},
    db::{MemoryStore, SqliteStore, Store, seed},
    services::spawn_session_sweeper,
    state::AppState,
};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(config: &ServerConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "minh_phat_server=info,tower_http=debug".into());

    let json_layer = config
        .log_json
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!config.log_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing(&config);

    match config.store {
        StoreKind::Memory => {
            tracing::info!("Using in-memory store");
            serve(config, MemoryStore::new()).await;
        }
        StoreKind::Sqlite => {
            let store = SqliteStore::connect(&config.database_url)
                .await
                .expect("Failed to open SQLite store");
            tracing::info!("SQLite store ready, migrations applied");
            serve(config, store).await;
        }
    }
}

async fn serve<S: Store>(config: ServerConfig, store: S) {
    if config.seed {
        seed::seed(&store, &config.admin_password)
            .await
            .expect("Failed to seed store");
    }

    let store = Arc::new(store);
    let sweeper = spawn_session_sweeper(Arc::clone(&store), config.sweep_interval);

    let addr = config.socket_addr();
    let state = AppState::new(config, store);
    let app = app(state);

    tracing::info!("minh-phat listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    sweeper.abort();
    tracing::info!("Session sweeper stopped");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
