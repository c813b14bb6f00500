use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use super::{record::UserRecord, role::Role};
use crate::db::DocRow;

/// Read/write surface of the `users` collection.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Every user, ordered by email ascending.
    async fn list_by_email(&self) -> anyhow::Result<Vec<UserRecord>>;
    async fn get(&self, id: &str) -> anyhow::Result<Option<UserRecord>>;
    async fn create(&self, record: &UserRecord) -> anyhow::Result<()>;
    async fn update_role(&self, id: &str, role: Role) -> anyhow::Result<()>;
    async fn update_blocked(&self, id: &str, blocked: bool) -> anyhow::Result<()>;
    async fn touch_last_login(&self, id: &str, at: OffsetDateTime) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn set_field(&self, id: &str, field: &str, value: serde_json::Value) -> anyhow::Result<()> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET doc = jsonb_set(doc, ARRAY[$2::text], $3::jsonb, true)
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(field)
        .bind(value)
        .execute(&self.db)
        .await
        .with_context(|| format!("update users.{field}"))?;
        anyhow::ensure!(res.rows_affected() == 1, "user {id} not found");
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn list_by_email(&self) -> anyhow::Result<Vec<UserRecord>> {
        let rows = sqlx::query_as::<_, DocRow>(
            r#"
            SELECT id, doc
              FROM users
             ORDER BY doc->>'email' ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        Ok(rows.into_iter().filter_map(|r| r.decode("users")).collect())
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<UserRecord>> {
        let row = sqlx::query_as::<_, DocRow>(r#"SELECT id, doc FROM users WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("get user")?;
        Ok(row.and_then(|r| r.decode("users")))
    }

    async fn create(&self, record: &UserRecord) -> anyhow::Result<()> {
        let mut doc = serde_json::to_value(record)?;
        if let Some(obj) = doc.as_object_mut() {
            obj.remove("id");
            if let Some(at) = record.created_at {
                obj.insert("createdAt".into(), crate::timestamp::to_value(at));
            }
        }
        sqlx::query(r#"INSERT INTO users (id, doc) VALUES ($1, $2)"#)
            .bind(&record.id)
            .bind(doc)
            .execute(&self.db)
            .await
            .context("insert user")?;
        Ok(())
    }

    async fn update_role(&self, id: &str, role: Role) -> anyhow::Result<()> {
        self.set_field(id, "role", serde_json::json!(role.as_str())).await
    }

    async fn update_blocked(&self, id: &str, blocked: bool) -> anyhow::Result<()> {
        self.set_field(id, "isBlocked", serde_json::json!(blocked)).await
    }

    async fn touch_last_login(&self, id: &str, at: OffsetDateTime) -> anyhow::Result<()> {
        self.set_field(id, "lastLogin", crate::timestamp::to_value(at)).await
    }
}
