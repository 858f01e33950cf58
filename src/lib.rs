//! Ricca Baby Catalog
//!
//! Storefront and admin backend for a maternity-bag brand.
//!
//! ## Features
//! - Product catalog grouped by category
//! - Search and category filtering
//! - Multi-image product galleries with a primary cover image
//! - WhatsApp inquiry links
//! - Admin management of products, categories and category covers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod config;
pub mod domain;
pub mod infrastructure;

use domain::aggregates::{CategoryError, CollectionError, ImageRecord, ProductError};
use domain::services::StorageError;
use domain::value_objects::ValueError;

// =============================================================================
// Stored Rows
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Single-image column kept from before multi-image galleries.
    pub image_url: Option<String>,
    pub image_alt: Option<String>,
    pub category_id: Uuid,
    pub whatsapp_link: Option<String>,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub cover_image_alt: Option<String>,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductImageRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub image_url: String,
    pub image_alt: String,
    pub display_order: i32,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ProductImageRow> for ImageRecord {
    fn from(row: ProductImageRow) -> Self {
        Self {
            id: row.id.to_string(),
            parent_id: Some(row.product_id),
            url: row.image_url,
            alt_text: row.image_alt,
            order: u32::try_from(row.display_order).unwrap_or(0),
            is_primary: row.is_primary,
        }
    }
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Category not found")]
    CategoryNotFound,

    #[error("Multiple product images are disabled")]
    MultiImageDisabled,

    #[error(transparent)]
    InvalidProduct(#[from] ProductError),

    #[error(transparent)]
    InvalidCategory(#[from] CategoryError),

    #[error(transparent)]
    InvalidValue(#[from] ValueError),

    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
