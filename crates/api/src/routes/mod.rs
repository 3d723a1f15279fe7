pub mod admin;
pub mod auth;
pub mod clients;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                      login (public)
/// /auth/refresh                                    refresh (public)
/// /auth/logout                                     logout (requires auth)
/// /auth/me                                         current user
///
/// /admin/users                                     list, create (admin only)
///
/// /clients                                         list, create
/// /clients/{id}                                    get, update, delete
/// /clients/{id}/restore                            restore (POST)
/// /clients/{client_id}/entities                    list, create
/// /clients/{client_id}/entities/selectable         selection list
/// /clients/{client_id}/entities/{id}               get, update, delete
/// /clients/{client_id}/accounts                    list, create
/// /clients/{client_id}/accounts/tree               chart of accounts tree
/// /clients/{client_id}/accounts/{id}               get, update, deactivate
/// /clients/{client_id}/staged-files/{key}          list, upload
/// /clients/{client_id}/staged-files/{key}/{id}     delete
/// /clients/{client_id}/reports/trial-balance       trial balance
/// /clients/{client_id}/reports/journal-lines       flat line export
///
/// /clients/{cid}/entities/{eid}/journal-entries                 list, create
/// /clients/{cid}/entities/{eid}/journal-entries/{id}            get, update, delete
/// /clients/{cid}/entities/{eid}/journal-entries/{id}/capabilities
/// /clients/{cid}/entities/{eid}/journal-entries/{id}/lines      add line (POST)
/// /clients/{cid}/entities/{eid}/journal-entries/{id}/lines/{l}  remove line (DELETE)
/// /clients/{cid}/entities/{eid}/journal-entries/{id}/post       post (POST, admin)
/// /clients/{cid}/entities/{eid}/journal-entries/{id}/void       void (POST, admin)
/// /clients/{cid}/entities/{eid}/journal-entries/{id}/files      list, upload
/// /clients/{cid}/entities/{eid}/journal-entries/{id}/files/promote
/// /clients/{cid}/entities/{eid}/journal-entries/{id}/files/{f}  delete
/// /clients/{cid}/entities/{eid}/journal-entries/{id}/files/{f}/content
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
        .nest("/clients", clients::router())
}
