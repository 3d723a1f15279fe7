//! Route definitions for the `/admin` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// All routes require the `admin` role (enforced by handler extractors).
///
/// ```text
/// GET    /users   -> list
/// POST   /users   -> create
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/users", get(users::list).post(users::create))
}
