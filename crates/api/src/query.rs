//! Shared query parameter types for API handlers.

use serde::Deserialize;
use tally_core::capabilities::ViewContext;
use tally_core::types::DbId;

/// `?include_inactive=` for entity and account listings.
#[derive(Debug, Deserialize)]
pub struct IncludeInactiveParams {
    #[serde(default)]
    pub include_inactive: bool,
}

/// `?include_deleted=` for client listings.
#[derive(Debug, Deserialize)]
pub struct IncludeDeletedParams {
    #[serde(default)]
    pub include_deleted: bool,
}

/// `?selected_id=` for the entity selection list.
#[derive(Debug, Deserialize)]
pub struct SelectableParams {
    pub selected_id: Option<DbId>,
}

/// `?context=` for the capabilities endpoint. Defaults to `detail`.
#[derive(Debug, Deserialize)]
pub struct ContextParams {
    #[serde(default)]
    pub context: ViewContext,
}

/// `?entity_id=` for report endpoints.
#[derive(Debug, Deserialize)]
pub struct EntityScopeParams {
    pub entity_id: Option<DbId>,
}
