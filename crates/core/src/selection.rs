//! Which entities a caller is offered when picking one for a client.

use crate::types::DbId;

/// Whether an entity belongs in a selection list.
///
/// Active, non-deleted entities are always offered. The currently selected
/// entity stays in the list after it is deactivated so an existing choice
/// keeps rendering; a deleted entity is never offered.
pub fn is_selectable(
    entity_id: DbId,
    is_active: bool,
    is_deleted: bool,
    selected_id: Option<DbId>,
) -> bool {
    if is_deleted {
        return false;
    }
    is_active || selected_id == Some(entity_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_entities_offered() {
        assert!(is_selectable(1, true, false, None));
        assert!(is_selectable(1, true, false, Some(2)));
    }

    #[test]
    fn inactive_entity_only_when_selected() {
        assert!(!is_selectable(1, false, false, None));
        assert!(!is_selectable(1, false, false, Some(2)));
        assert!(is_selectable(1, false, false, Some(1)));
    }

    #[test]
    fn deleted_never_offered() {
        assert!(!is_selectable(1, true, true, Some(1)));
        assert!(!is_selectable(1, false, true, Some(1)));
    }
}
