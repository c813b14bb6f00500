use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// Sign-in credentials, kept apart from the `users` documents.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
    pub id: String,                 // same id as the user document
    pub email: String,              // normalised email
    #[serde(skip_serializing)]
    pub password_hash: String,      // Argon2 hash, never exposed
    pub created_at: OffsetDateTime,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>>;
    async fn create(&self, id: &str, email: &str, password_hash: &str) -> anyhow::Result<Account>;
    async fn delete(&self, id: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgAccountStore {
    db: PgPool,
}

impl PgAccountStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find account by email")?;
        Ok(account)
    }

    async fn create(&self, id: &str, email: &str, password_hash: &str) -> anyhow::Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .context("insert account")?;
        Ok(account)
    }

    async fn delete(&self, id: &str) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM accounts WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete account")?;
        Ok(())
    }
}
