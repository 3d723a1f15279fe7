use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tally_db::files::LocalFileStore;
use tally_db::Storage;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tally_api::background::{session_cleanup, staged_cleanup};
use tally_api::config::{ServerConfig, StorageBackend};
use tally_api::router::build_app_router;
use tally_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally_api=debug,tally_db=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Storage ---
    let (storage, pool) = match &config.storage {
        StorageBackend::Postgres {
            database_url,
            attachment_dir,
        } => {
            let pool = tally_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            tally_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            tally_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            let files = Arc::new(LocalFileStore::new(attachment_dir.clone()));
            tracing::info!(dir = %attachment_dir.display(), "Attachment content on local disk");
            (Storage::postgres(pool.clone(), files), Some(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory backend; data is lost on restart");
            (Storage::in_memory(), None)
        }
    };

    if let Some(admin) = &config.bootstrap_admin {
        tally_api::bootstrap::ensure_admin(&storage, admin)
            .await
            .expect("Failed to create bootstrap admin");
    }

    // --- Background jobs ---
    let cancel = CancellationToken::new();
    let staged_handle = tokio::spawn(staged_cleanup::run(
        storage.clone(),
        config.staged_file_ttl_hours,
        cancel.clone(),
    ));
    let session_handle = tokio::spawn(session_cleanup::run(storage.clone(), cancel.clone()));

    // --- App state ---
    let state = AppState {
        storage,
        pool,
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    let _ = tokio::time::timeout(grace, staged_handle).await;
    let _ = tokio::time::timeout(grace, session_handle).await;
    tracing::info!("Background jobs stopped");

    tracing::info!("Graceful shutdown complete");
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
