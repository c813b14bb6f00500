use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

fn default_currency() -> String {
    "USD".into()
}

/// A gift card on sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, rename = "imageURL")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock: i64,
    #[serde(
        default,
        deserialize_with = "crate::timestamp::lenient",
        serialize_with = "crate::timestamp::serialize"
    )]
    pub created_at: Option<OffsetDateTime>,
}

/// A placed order; only read for dashboard figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::timestamp::lenient",
        serialize_with = "crate::timestamp::serialize"
    )]
    pub created_at: Option<OffsetDateTime>,
}

impl Order {
    pub fn is_cancelled(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("cancelled"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn product_defaults() {
        let p: Product = serde_json::from_value(json!({ "id": "p1", "name": "Amazon $25" })).unwrap();
        assert_eq!(p.currency, "USD");
        assert_eq!(p.stock, 0);
        assert_eq!(p.created_at, None);
    }

    #[test]
    fn cancelled_status_is_case_insensitive() {
        let mut o: Order = serde_json::from_value(json!({ "id": "o1", "total": 10.0 })).unwrap();
        assert!(!o.is_cancelled());
        o.status = Some("Cancelled".into());
        assert!(o.is_cancelled());
    }
}
