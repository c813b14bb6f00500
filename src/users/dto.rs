use serde::{Deserialize, Serialize};

use super::{
    directory::{DirectoryRow, Notice},
    projection::{SortField, SortState},
    role::Role,
};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub sort: Option<SortField>,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub loading: bool,
    pub sort: SortState,
    pub search: String,
    pub users: Vec<DirectoryRow>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

/// `isBlocked` is the status the viewer saw before toggling.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleBlockRequest {
    pub is_blocked: bool,
}

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub success: bool,
    pub notices: Vec<Notice>,
}
