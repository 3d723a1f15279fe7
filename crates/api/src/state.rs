use std::sync::Arc;

use tally_db::{DbPool, Storage};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: `Storage` is a set of `Arc` handles.
#[derive(Clone)]
pub struct AppState {
    /// Persistence façade over the configured backend.
    pub storage: Storage,
    /// The Postgres pool behind `storage`, if any. Only the health check uses it.
    pub pool: Option<DbPool>,
    pub config: Arc<ServerConfig>,
}
