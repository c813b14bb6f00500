//! The single authoritative rule set for directory actions.
//!
//! Both the per-row capability flags and the mutation guards call these
//! functions, so what the view offers is exactly what a mutation accepts.

use serde::Serialize;

use super::{error::DirectoryError, record::UserRecord, role::Role};

/// The signed-in actor. `role` stays `None` until the own-record lookup
/// resolves, which leaves every gated action unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    pub id: Option<String>,
    pub role: Option<Role>,
}

impl Viewer {
    pub fn new(id: impl Into<String>, role: Option<Role>) -> Self {
        Self {
            id: Some(id.into()),
            role,
        }
    }

    pub fn is(&self, user_id: &str) -> bool {
        self.id.as_deref() == Some(user_id)
    }
}

pub fn can_change_role(viewer: &Viewer) -> bool {
    viewer.role == Some(Role::SuperAdmin)
}

pub fn check_change_role(viewer: &Viewer) -> Result<(), DirectoryError> {
    if can_change_role(viewer) {
        Ok(())
    } else {
        Err(DirectoryError::PermissionDenied)
    }
}

/// Self check first, then privilege. Existence is the caller's concern.
pub fn can_toggle_block(viewer: &Viewer, target: &UserRecord) -> Result<(), DirectoryError> {
    if viewer.is(&target.id) {
        return Err(DirectoryError::SelfActionDenied);
    }
    match viewer.role {
        Some(Role::SuperAdmin) => Ok(()),
        Some(Role::Admin) if !target.role.is_some_and(Role::is_staff) => Ok(()),
        _ => Err(DirectoryError::InsufficientPrivilege),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowCapabilities {
    pub can_edit: bool,
    pub can_block: bool,
}

pub fn row_capabilities(viewer: &Viewer, target: &UserRecord) -> RowCapabilities {
    RowCapabilities {
        can_edit: can_change_role(viewer),
        can_block: can_toggle_block(viewer, target).is_ok(),
    }
}
