//! Route definitions for `/clients` and everything nested below a client.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{accounts, attachments, clients, entities, journal_entries, reports};
use crate::state::AppState;

/// Routes mounted at `/clients`.
///
/// Parameter names are shared by every route that has a segment in the same
/// position, as the path router requires.
///
/// ```text
/// GET, POST            /                                   -> list, create
/// GET, PUT, DELETE     /{client_id}                        -> get_by_id, update, delete
/// POST                 /{client_id}/restore                -> restore
///
/// GET, POST            /{client_id}/entities               -> list, create
/// GET                  /{client_id}/entities/selectable    -> selectable
/// GET, PUT, DELETE     /{client_id}/entities/{entity_id}   -> get_by_id, update, delete
///
/// GET, POST            /{client_id}/accounts               -> list, create
/// GET                  /{client_id}/accounts/tree          -> tree
/// GET, PUT, DELETE     /{client_id}/accounts/{id}          -> get_by_id, update, deactivate
///
/// GET, POST            /{client_id}/staged-files/{staging_key}            -> list, upload
/// DELETE               /{client_id}/staged-files/{staging_key}/{file_id}  -> delete
///
/// GET                  /{client_id}/reports/trial-balance  -> trial_balance
/// GET                  /{client_id}/reports/journal-lines  -> journal_lines
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(clients::list).post(clients::create))
        .route(
            "/{client_id}",
            get(clients::get_by_id)
                .put(clients::update)
                .delete(clients::delete),
        )
        .route("/{client_id}/restore", post(clients::restore))
        .route(
            "/{client_id}/entities",
            get(entities::list).post(entities::create),
        )
        .route("/{client_id}/entities/selectable", get(entities::selectable))
        .route(
            "/{client_id}/entities/{entity_id}",
            get(entities::get_by_id)
                .put(entities::update)
                .delete(entities::delete),
        )
        .nest(
            "/{client_id}/entities/{entity_id}/journal-entries",
            journal_entry_router(),
        )
        .route(
            "/{client_id}/accounts",
            get(accounts::list).post(accounts::create),
        )
        .route("/{client_id}/accounts/tree", get(accounts::tree))
        .route(
            "/{client_id}/accounts/{id}",
            get(accounts::get_by_id)
                .put(accounts::update)
                .delete(accounts::deactivate),
        )
        .route(
            "/{client_id}/staged-files/{staging_key}",
            get(attachments::list_staged).post(attachments::upload_staged),
        )
        .route(
            "/{client_id}/staged-files/{staging_key}/{file_id}",
            delete(attachments::delete_staged),
        )
        .route(
            "/{client_id}/reports/trial-balance",
            get(reports::trial_balance),
        )
        .route(
            "/{client_id}/reports/journal-lines",
            get(reports::journal_lines),
        )
}

/// Routes nested at `/{client_id}/entities/{entity_id}/journal-entries`.
///
/// ```text
/// GET, POST            /                                   -> list, create
/// GET, PUT, DELETE     /{id}                               -> get_by_id, update, delete
/// GET                  /{id}/capabilities                  -> get_capabilities
/// POST                 /{id}/lines                         -> add_line
/// DELETE               /{id}/lines/{line_id}               -> remove_line
/// POST                 /{id}/post                          -> post
/// POST                 /{id}/void                          -> void
/// GET, POST            /{id}/files                         -> list, upload
/// POST                 /{id}/files/promote                 -> promote
/// GET                  /{id}/files/{file_id}/content       -> download
/// DELETE               /{id}/files/{file_id}               -> delete
/// ```
fn journal_entry_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(journal_entries::list).post(journal_entries::create),
        )
        .route(
            "/{id}",
            get(journal_entries::get_by_id)
                .put(journal_entries::update)
                .delete(journal_entries::delete),
        )
        .route("/{id}/capabilities", get(journal_entries::get_capabilities))
        .route("/{id}/lines", post(journal_entries::add_line))
        .route(
            "/{id}/lines/{line_id}",
            delete(journal_entries::remove_line),
        )
        .route("/{id}/post", post(journal_entries::post))
        .route("/{id}/void", post(journal_entries::void))
        .route(
            "/{id}/files",
            get(attachments::list_for_entry).post(attachments::upload_for_entry),
        )
        .route("/{id}/files/promote", post(attachments::promote))
        .route(
            "/{id}/files/{file_id}/content",
            get(attachments::download),
        )
        .route(
            "/{id}/files/{file_id}",
            delete(attachments::delete_for_entry),
        )
}
