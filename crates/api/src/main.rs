use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use jamlist_core::protocol::ServerMessage;
use jamlist_db::{InMemoryAdapter, NoopAdapter, SharedAdapter, SheetsAdapter};
use jamlist_events::BroadcastBus;
use jamlist_sync::SyncCoordinator;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jamlist_api::config::{PersistenceBackend, PersistenceConfig, ServerConfig};
use jamlist_api::router::build_app_router;
use jamlist_api::state::AppState;
use jamlist_api::ws;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    init_tracing();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        backend = ?config.persistence.backend,
        "Loaded server configuration",
    );

    // --- Durable store ---
    let adapter = connect_persistence(&config.persistence).await;

    // --- Broadcast bus ---
    let bus = Arc::new(BroadcastBus::<ServerMessage>::new());

    // --- Coordinator + persistence worker ---
    let persistence_cancel = CancellationToken::new();
    let (coordinator, persistence_handle) = SyncCoordinator::start(
        adapter,
        Arc::clone(&bus),
        config.persistence.timeout,
        persistence_cancel.clone(),
    );
    let coordinator = Arc::new(coordinator);
    coordinator.bootstrap().await;

    // --- Heartbeat ---
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&bus), ws::HEARTBEAT_INTERVAL);

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        coordinator: Arc::clone(&coordinator),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(
        %addr,
        persistence_enabled = coordinator.persistence_enabled(),
        "Starting server",
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    // Close sockets as soon as shutdown starts; graceful shutdown waits for
    // upgraded connections to finish.
    let shutdown_bus = Arc::clone(&bus);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_bus.shutdown_all().await;
        })
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    heartbeat_handle.abort();
    tracing::info!("Heartbeat task stopped");

    persistence_cancel.cancel();
    if let Some(handle) = persistence_handle {
        let budget = Duration::from_secs(config.shutdown_timeout_secs);
        if tokio::time::timeout(budget, handle).await.is_err() {
            tracing::warn!(
                timeout_secs = config.shutdown_timeout_secs,
                "Persistence worker did not drain in time",
            );
        }
    }

    tracing::info!("Graceful shutdown complete");
}

/// `RUST_LOG` filter with a sensible default; `LOG_FORMAT=json` switches to
/// the JSON formatter.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "jamlist_api=debug,jamlist_sync=debug,jamlist_db=info,tower_http=debug".into()
    });

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Pick the durable store. A backend that fails to connect is replaced by
/// memory-only mode; the server still starts.
async fn connect_persistence(config: &PersistenceConfig) -> SharedAdapter {
    match config.backend {
        PersistenceBackend::None => Arc::new(NoopAdapter),
        PersistenceBackend::Memory => {
            tracing::info!("Using process-local durable store");
            Arc::new(InMemoryAdapter::new())
        }
        PersistenceBackend::Sheets => {
            let Some(sheets) = config.sheets.clone() else {
                tracing::warn!("Sheets backend selected without configuration");
                return Arc::new(NoopAdapter);
            };
            let spreadsheet_id = sheets.spreadsheet_id.clone();
            match SheetsAdapter::connect(sheets).await {
                Ok(adapter) => {
                    tracing::info!(spreadsheet_id = %spreadsheet_id, "Spreadsheet backend connected");
                    Arc::new(adapter)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Spreadsheet backend unavailable, running in memory-only mode");
                    tracing::warn!("Check that GOOGLE_SHEET_ID is correct, GOOGLE_CREDENTIALS_PATH points at a service-account key, and the sheet is shared with that account");
                    Arc::new(NoopAdapter)
                }
            }
        }
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
