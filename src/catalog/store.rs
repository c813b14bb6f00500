use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{Order, Product};
use crate::db::DocRow;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Every product, ordered by name.
    async fn list_products(&self) -> anyhow::Result<Vec<Product>>;
    async fn get_product(&self, id: &str) -> anyhow::Result<Option<Product>>;
    async fn list_orders(&self) -> anyhow::Result<Vec<Order>>;
}

#[derive(Clone)]
pub struct PgCatalogStore {
    db: PgPool,
}

impl PgCatalogStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn list_products(&self) -> anyhow::Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, DocRow>(
            r#"
            SELECT id, doc
              FROM products
             ORDER BY doc->>'name' ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list products")?;
        Ok(rows.into_iter().filter_map(|r| r.decode("products")).collect())
    }

    async fn get_product(&self, id: &str) -> anyhow::Result<Option<Product>> {
        let row = sqlx::query_as::<_, DocRow>(r#"SELECT id, doc FROM products WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("get product")?;
        Ok(row.and_then(|r| r.decode("products")))
    }

    async fn list_orders(&self) -> anyhow::Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, DocRow>(r#"SELECT id, doc FROM orders"#)
            .fetch_all(&self.db)
            .await
            .context("list orders")?;
        Ok(rows.into_iter().filter_map(|r| r.decode("orders")).collect())
    }
}

#[cfg(test)]
pub mod memory {
    use super::*;

    #[derive(Default)]
    pub struct MemoryCatalogStore {
        pub products: Vec<Product>,
        pub orders: Vec<Order>,
    }

    #[async_trait]
    impl CatalogStore for MemoryCatalogStore {
        async fn list_products(&self) -> anyhow::Result<Vec<Product>> {
            let mut products = self.products.clone();
            products.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(products)
        }

        async fn get_product(&self, id: &str) -> anyhow::Result<Option<Product>> {
            Ok(self.products.iter().find(|p| p.id == id).cloned())
        }

        async fn list_orders(&self) -> anyhow::Result<Vec<Order>> {
            Ok(self.orders.clone())
        }
    }
}
