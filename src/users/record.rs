use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use super::role::Role;

/// One row of the `users` collection.
///
/// Reading never rejects a document over one badly typed field: strings
/// that are missing or not text become `None`, `isBlocked` falls back to
/// `false`, and a role outside the known set is kept only as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredUser")]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub role: Option<Role>,
    #[serde(skip)]
    pub unknown_role: Option<String>,
    pub display_name: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub phone_number: Option<String>,
    #[serde(serialize_with = "crate::timestamp::serialize")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(serialize_with = "crate::timestamp::serialize")]
    pub last_login: Option<OffsetDateTime>,
    pub is_blocked: bool,
}

impl UserRecord {
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Option<Role>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role,
            unknown_role: None,
            display_name: None,
            name: None,
            photo_url: None,
            phone_number: None,
            created_at: None,
            last_login: None,
            is_blocked: false,
        }
    }

    /// `displayName`, then `name`, then "Anonymous".
    pub fn display_label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("Anonymous")
    }

    /// The role as stored, known or not.
    pub fn role_label(&self) -> Option<&str> {
        self.role.map(Role::as_str).or(self.unknown_role.as_deref())
    }

    pub fn set_role(&mut self, role: Role) {
        self.role = Some(role);
        self.unknown_role = None;
    }
}

/// The document as stored, before field values are normalised.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    id: String,
    #[serde(default, deserialize_with = "text")]
    email: Option<String>,
    #[serde(default, deserialize_with = "text")]
    role: Option<String>,
    #[serde(default, deserialize_with = "text")]
    display_name: Option<String>,
    #[serde(default, deserialize_with = "text")]
    name: Option<String>,
    #[serde(default, rename = "photoURL", deserialize_with = "text")]
    photo_url: Option<String>,
    #[serde(default, deserialize_with = "text")]
    phone_number: Option<String>,
    #[serde(default, deserialize_with = "crate::timestamp::lenient")]
    created_at: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "crate::timestamp::lenient")]
    last_login: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "flag")]
    is_blocked: bool,
}

impl From<StoredUser> for UserRecord {
    fn from(doc: StoredUser) -> Self {
        let role = doc.role.as_deref().and_then(Role::parse);
        Self {
            id: doc.id,
            email: doc.email.unwrap_or_default(),
            unknown_role: if role.is_none() { doc.role } else { None },
            role,
            display_name: doc.display_name,
            name: doc.name,
            photo_url: doc.photo_url,
            phone_number: doc.phone_number,
            created_at: doc.created_at,
            last_login: doc.last_login,
            is_blocked: doc.is_blocked,
        }
    }
}

// Numbers are kept as their text (phone numbers are sometimes stored bare).
fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}
