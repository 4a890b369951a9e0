//! Housecall server binary — places outbound appointment-confirmation
//! calls and tracks their transcripts and outcomes.
//!
//! Starts an axum HTTP server with structured logging, database
//! initialization, store load, and graceful shutdown on SIGTERM/SIGINT.

use housecall_server::{app, background, config, dialer, AppState};
use housecall_store::{CallRecordStore, SqliteBackend};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("HOUSECALL_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration — the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Initialize database
    let pool = housecall_db::create_pool(
        &config.database.path,
        housecall_db::DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
        },
    )
    .expect("failed to create database pool — check database.path in config");

    {
        let conn = pool
            .get()
            .expect("failed to get database connection for migrations");
        let applied =
            housecall_db::run_migrations(&conn).expect("failed to run database migrations");
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
    }

    // Load the call record store before accepting any traffic.
    let backend = Arc::new(SqliteBackend::new(pool));
    let store = Arc::new(
        CallRecordStore::open(backend).expect("failed to load call records from the database"),
    );

    // Pick the dialer: real provider if configured, otherwise a local
    // stand-in so the service still runs end to end in development.
    let dialer: Arc<dyn dialer::Dialer> = if config.telephony.api_base_url.is_empty() {
        tracing::warn!("telephony.api_base_url not set; using static dialer (no real calls)");
        Arc::new(dialer::StaticDialer::new())
    } else {
        Arc::new(dialer::HttpDialer::new(config.telephony.clone()))
    };

    let state = Arc::new(AppState {
        store: Arc::clone(&store),
        dialer,
    });

    tokio::spawn(background::start_reconcile_task(
        Arc::clone(&store),
        config.telephony.reconcile_interval_secs,
    ));

    // Build application
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting housecall server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address — is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // Drain queued saves before exit.
    store.flush();
    tracing::info!("housecall server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
