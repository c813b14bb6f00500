use thiserror::Error;

/// Why a directory mutation was refused or failed.
///
/// The `Display` text is what the viewer sees in a notice.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Only a super admin can change user roles")]
    PermissionDenied,

    #[error("You cannot block or unblock your own account")]
    SelfActionDenied,

    #[error("Admins cannot block or unblock other admins or super admins")]
    InsufficientPrivilege,

    #[error("User not found")]
    NotFound,

    #[error("The update could not be saved, please try again")]
    BackendFailure(#[from] anyhow::Error),
}

impl DirectoryError {
    pub fn kind(&self) -> &'static str {
        match self {
            DirectoryError::PermissionDenied => "permission_denied",
            DirectoryError::SelfActionDenied => "self_action_denied",
            DirectoryError::InsufficientPrivilege => "insufficient_privilege",
            DirectoryError::NotFound => "not_found",
            DirectoryError::BackendFailure(_) => "backend_failure",
        }
    }
}
