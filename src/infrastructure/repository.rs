//! `product_images` persistence: Postgres for the service, in-memory for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::aggregates::ImageRecord;
use crate::domain::services::ProductImageRepository;
use crate::{ProductImageRow, Result};

#[derive(Clone)]
pub struct PgProductImageRepository {
    pool: PgPool,
}

impl PgProductImageRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    /// Images of many products at once, grouped by product and ordered.
    pub async fn list_for_parents(&self, parent_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<ImageRecord>>> {
        let rows = sqlx::query_as::<_, ProductImageRow>(
            "SELECT * FROM product_images WHERE product_id = ANY($1) ORDER BY product_id, display_order",
        )
        .bind(parent_ids)
        .fetch_all(&self.pool)
        .await?;
        let mut grouped: HashMap<Uuid, Vec<ImageRecord>> = HashMap::new();
        for row in rows {
            grouped.entry(row.product_id).or_default().push(row.into());
        }
        Ok(grouped)
    }
}

#[async_trait]
impl ProductImageRepository for PgProductImageRepository {
    async fn list_for_parent(&self, parent_id: Uuid) -> Result<Vec<ImageRecord>> {
        let rows = sqlx::query_as::<_, ProductImageRow>(
            "SELECT * FROM product_images WHERE product_id = $1 ORDER BY display_order",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_all_for_parent(&self, parent_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM product_images WHERE product_id = $1")
            .bind(parent_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_all(&self, parent_id: Uuid, records: &[ImageRecord]) -> Result<Vec<ImageRecord>> {
        let mut conn = self.pool.acquire().await?;
        insert_rows(&mut conn, parent_id, records).await
    }

    async fn replace_all_for_parent(&self, parent_id: Uuid, records: &[ImageRecord]) -> Result<Vec<ImageRecord>> {
        let mut tx = self.pool.begin().await?;

        // Serializes replaces of the same product for the life of the transaction.
        sqlx::query("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(parent_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM product_images WHERE product_id = $1")
            .bind(parent_id)
            .execute(&mut *tx)
            .await?;
        let stored = insert_rows(&mut tx, parent_id, records).await?;

        tx.commit().await?;
        Ok(stored)
    }
}

async fn insert_rows(conn: &mut PgConnection, parent_id: Uuid, records: &[ImageRecord]) -> Result<Vec<ImageRecord>> {
    let mut stored = Vec::with_capacity(records.len());
    for record in records {
        let row = sqlx::query_as::<_, ProductImageRow>(
            "INSERT INTO product_images (id, product_id, image_url, image_alt, display_order, is_primary, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW()) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(parent_id)
        .bind(&record.url)
        .bind(&record.alt_text)
        .bind(record.order as i32)
        .bind(record.is_primary)
        .fetch_one(&mut *conn)
        .await?;
        stored.push(row.into());
    }
    Ok(stored)
}

#[derive(Default)]
pub struct InMemoryProductImageRepository {
    rows: RwLock<HashMap<Uuid, Vec<ImageRecord>>>,
}

#[async_trait]
impl ProductImageRepository for InMemoryProductImageRepository {
    async fn list_for_parent(&self, parent_id: Uuid) -> Result<Vec<ImageRecord>> {
        let mut records = self.rows.read().await.get(&parent_id).cloned().unwrap_or_default();
        records.sort_by_key(|r| r.order);
        Ok(records)
    }

    async fn delete_all_for_parent(&self, parent_id: Uuid) -> Result<()> {
        self.rows.write().await.remove(&parent_id);
        Ok(())
    }

    async fn insert_all(&self, parent_id: Uuid, records: &[ImageRecord]) -> Result<Vec<ImageRecord>> {
        let stored: Vec<ImageRecord> = records.iter().map(|r| ImageRecord {
            id: Uuid::now_v7().to_string(),
            parent_id: Some(parent_id),
            ..r.clone()
        }).collect();
        self.rows.write().await.entry(parent_id).or_default().extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn replace_all_for_parent(&self, parent_id: Uuid, records: &[ImageRecord]) -> Result<Vec<ImageRecord>> {
        let stored: Vec<ImageRecord> = records.iter().map(|r| ImageRecord {
            id: Uuid::now_v7().to_string(),
            parent_id: Some(parent_id),
            ..r.clone()
        }).collect();
        self.rows.write().await.insert(parent_id, stored.clone());
        Ok(stored)
    }
}
