//! Action policy for journal entry views.
//!
//! Which controls a caller may use is a pure function of the entry status,
//! the caller's role and the view it is looking at. Handlers authorise
//! mutations through [`capabilities`] and the same value is returned to API
//! callers so every screen renders identical controls.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::journal::JournalStatus;
use crate::roles::Role;

/// The surface a caller is acting from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewContext {
    /// Composing an entry that has not been saved yet.
    Create,
    /// Editing an existing entry.
    Edit,
    /// Read-only detail view.
    #[default]
    Detail,
}

impl FromStr for ViewContext {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "edit" => Ok(Self::Edit),
            "detail" => Ok(Self::Detail),
            other => Err(CoreError::Validation(format!(
                "Invalid view context '{other}'. Must be one of: create, edit, detail"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capabilities {
    pub can_edit: bool,
    pub can_post: bool,
    pub can_void: bool,
    pub can_manage_attachments: bool,
}

/// Compute the capability set for `(status, role, context)`.
pub fn capabilities(status: JournalStatus, role: Role, context: ViewContext) -> Capabilities {
    let is_draft = status == JournalStatus::Draft;
    let editing_surface = matches!(context, ViewContext::Create | ViewContext::Edit);

    Capabilities {
        can_edit: is_draft && role.can_write(),
        can_post: is_draft && role.is_privileged(),
        can_void: status == JournalStatus::Posted && role.is_privileged(),
        can_manage_attachments: is_draft && editing_surface && role.can_write(),
    }
}

/// Capabilities for an entry that does not exist yet.
pub fn creation_capabilities(role: Role) -> Capabilities {
    capabilities(JournalStatus::Draft, role, ViewContext::Create)
}

/// Turn a denied capability into a `Forbidden` or `Validation` error.
///
/// Role problems are reported as forbidden; status problems go through the
/// lifecycle guard so the message names the blocking status.
pub fn require(
    allowed: bool,
    role_ok: bool,
    action: &str,
    status_check: impl FnOnce() -> Result<(), CoreError>,
) -> Result<(), CoreError> {
    if allowed {
        return Ok(());
    }
    if !role_ok {
        return Err(CoreError::Forbidden(format!(
            "Your role is not allowed to {action}"
        )));
    }
    status_check()?;
    Err(CoreError::Validation(format!("Cannot {action} here")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [JournalStatus; 3] = [
        JournalStatus::Draft,
        JournalStatus::Posted,
        JournalStatus::Voided,
    ];
    const ALL_ROLES: [Role; 3] = [Role::Admin, Role::Accountant, Role::Viewer];

    #[test]
    fn edit_only_on_drafts() {
        for status in ALL_STATUSES {
            let caps = capabilities(status, Role::Accountant, ViewContext::Detail);
            assert_eq!(caps.can_edit, status == JournalStatus::Draft);
        }
    }

    #[test]
    fn post_only_for_privileged_on_drafts() {
        for status in ALL_STATUSES {
            for role in ALL_ROLES {
                let caps = capabilities(status, role, ViewContext::Detail);
                assert_eq!(
                    caps.can_post,
                    status == JournalStatus::Draft && role == Role::Admin,
                    "{status} / {role}"
                );
            }
        }
    }

    #[test]
    fn void_only_for_privileged_on_posted() {
        assert!(capabilities(JournalStatus::Posted, Role::Admin, ViewContext::Detail).can_void);
        assert!(!capabilities(JournalStatus::Posted, Role::Accountant, ViewContext::Detail).can_void);
        assert!(!capabilities(JournalStatus::Draft, Role::Admin, ViewContext::Detail).can_void);
        assert!(!capabilities(JournalStatus::Voided, Role::Admin, ViewContext::Detail).can_void);
    }

    #[test]
    fn attachments_never_managed_from_detail_view() {
        for status in ALL_STATUSES {
            for role in ALL_ROLES {
                let caps = capabilities(status, role, ViewContext::Detail);
                assert!(!caps.can_manage_attachments);
            }
        }
    }

    #[test]
    fn attachments_managed_while_composing_or_editing_drafts() {
        assert!(creation_capabilities(Role::Accountant).can_manage_attachments);
        assert!(capabilities(JournalStatus::Draft, Role::Admin, ViewContext::Edit).can_manage_attachments);
        assert!(!capabilities(JournalStatus::Posted, Role::Admin, ViewContext::Edit).can_manage_attachments);
        assert!(!capabilities(JournalStatus::Draft, Role::Viewer, ViewContext::Edit).can_manage_attachments);
    }

    #[test]
    fn viewer_gets_nothing() {
        for status in ALL_STATUSES {
            for context in [ViewContext::Create, ViewContext::Edit, ViewContext::Detail] {
                assert_eq!(capabilities(status, Role::Viewer, context), Capabilities::default());
            }
        }
    }

    #[test]
    fn require_reports_role_before_status() {
        let err = require(false, false, "post entries", || Ok(())).unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let err = require(false, true, "post entries", || {
            Err(CoreError::Validation("Journal entry is voided".into()))
        })
        .unwrap_err();
        assert!(err.to_string().contains("voided"));

        assert!(require(true, true, "post entries", || Ok(())).is_ok());
    }

    #[test]
    fn context_parses() {
        assert_eq!("edit".parse::<ViewContext>().unwrap(), ViewContext::Edit);
        assert!("print".parse::<ViewContext>().is_err());
        assert_eq!(ViewContext::default(), ViewContext::Detail);
    }
}
