use anyhow::Context;
use serde::de::DeserializeOwned;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};

use crate::config::AppConfig;

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")
}

/// One document of a `(id, doc jsonb)` collection table.
#[derive(Debug, Clone, FromRow)]
pub struct DocRow {
    pub id: String,
    pub doc: serde_json::Value,
}

impl DocRow {
    /// Decodes the document body, injecting the row id as `id`.
    ///
    /// Returns `None` for documents that do not fit `T`; the collection
    /// read carries on without them.
    pub fn decode<T: DeserializeOwned>(self, collection: &str) -> Option<T> {
        let mut doc = self.doc;
        if let Some(obj) = doc.as_object_mut() {
            obj.insert("id".into(), serde_json::Value::String(self.id.clone()));
        }
        match serde_json::from_value(doc) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, id = %self.id, collection, "skipping malformed document");
                None
            }
        }
    }
}
