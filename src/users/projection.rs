use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{record::UserRecord, role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    Email,
    Name,
    DisplayName,
    PhoneNumber,
    Role,
    CreatedAt,
    LastLogin,
    IsBlocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortState {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortState {
    /// Same field flips direction; a new field starts ascending.
    pub fn select(&mut self, field: SortField) {
        if self.field == field {
            self.direction = self.direction.flipped();
        } else {
            self.field = field;
            self.direction = SortDirection::Asc;
        }
    }
}

/// Filters and sorts the roster without touching it.
pub fn project<'a>(roster: &'a [UserRecord], search: &str, sort: SortState) -> Vec<&'a UserRecord> {
    let needle = search.to_lowercase();
    let mut rows: Vec<&UserRecord> = roster.iter().filter(|r| matches(r, &needle)).collect();
    rows.sort_by(|a, b| {
        let ord = compare(a, b, sort.field);
        match sort.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    rows
}

fn matches(record: &UserRecord, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let hit = |s: &str| s.to_lowercase().contains(needle);
    hit(&record.email)
        || record.name.as_deref().is_some_and(hit)
        || record.display_name.as_deref().is_some_and(hit)
        || record.role_label().is_some_and(hit)
}

fn compare(a: &UserRecord, b: &UserRecord, field: SortField) -> Ordering {
    match field {
        SortField::Email => collate(&a.email, &b.email),
        SortField::Name => collate_opt(&a.name, &b.name),
        SortField::DisplayName => collate_opt(&a.display_name, &b.display_name),
        SortField::PhoneNumber => collate_opt(&a.phone_number, &b.phone_number),
        SortField::Role => role::rank(a.role).cmp(&role::rank(b.role)),
        SortField::CreatedAt => epoch(a.created_at).cmp(&epoch(b.created_at)),
        SortField::LastLogin => epoch(a.last_login).cmp(&epoch(b.last_login)),
        SortField::IsBlocked => a.is_blocked.cmp(&b.is_blocked),
    }
}

fn epoch(at: Option<OffsetDateTime>) -> OffsetDateTime {
    at.unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

// Case-insensitive first so "bob" and "Bob" sit together, raw text breaks ties.
fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn collate_opt(a: &Option<String>, b: &Option<String>) -> Ordering {
    collate(a.as_deref().unwrap_or(""), b.as_deref().unwrap_or(""))
}
