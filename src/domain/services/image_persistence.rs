//! Loading and saving a product's image collection with full-replace semantics.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::{ImageCollection, ImageRecord};
use crate::Result;

/// Durable storage for the `product_images` rows of one parent.
#[async_trait]
pub trait ProductImageRepository: Send + Sync {
    /// Rows ordered by display order.
    async fn list_for_parent(&self, parent_id: Uuid) -> Result<Vec<ImageRecord>>;
    async fn delete_all_for_parent(&self, parent_id: Uuid) -> Result<()>;
    /// Inserts the rows in order and returns them with backend-assigned ids.
    async fn insert_all(&self, parent_id: Uuid, records: &[ImageRecord]) -> Result<Vec<ImageRecord>>;
    /// `delete_all_for_parent` followed by `insert_all` as one unit: either the whole new
    /// set is stored or the previous one is left untouched, and concurrent replaces of the
    /// same parent never interleave.
    async fn replace_all_for_parent(&self, parent_id: Uuid, records: &[ImageRecord]) -> Result<Vec<ImageRecord>>;
}

pub async fn load_collection<R>(repo: &R, parent_id: Uuid, parent_name: &str) -> Result<ImageCollection>
where
    R: ProductImageRepository + ?Sized,
{
    let records = repo.list_for_parent(parent_id).await?;
    Ok(ImageCollection::seeded(Some(parent_id), parent_name, records))
}

/// Replaces every stored image of `parent_id` with the collection's contents.
pub async fn save_collection<R>(repo: &R, parent_id: Uuid, mut collection: ImageCollection) -> Result<ImageCollection>
where
    R: ProductImageRepository + ?Sized,
{
    collection.attach_to(parent_id);
    let parent_name = collection.parent_name().to_string();
    let records = collection.into_records();

    let stored = repo.replace_all_for_parent(parent_id, &records).await?;
    info!(%parent_id, count = stored.len(), "product images saved");

    Ok(ImageCollection::seeded(Some(parent_id), parent_name, stored))
}
