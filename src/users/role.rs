use serde::{Deserialize, Serialize};

/// Privilege level of a user, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Client,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Admin => "admin",
            Role::SuperAdmin => "superAdmin",
        }
    }

    pub fn parse(raw: &str) -> Option<Role> {
        match raw {
            "client" => Some(Role::Client),
            "admin" => Some(Role::Admin),
            "superAdmin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }

    /// Whether the role belongs to back-office staff.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

/// Numeric rank used for ordering; absent or unknown roles rank lowest.
pub fn rank(role: Option<Role>) -> u8 {
    match role {
        Some(Role::SuperAdmin) => 3,
        Some(Role::Admin) => 2,
        Some(Role::Client) => 1,
        None => 0,
    }
}
