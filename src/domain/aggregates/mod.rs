//! Aggregates module
pub mod image_collection;
pub mod product;
pub mod category;

pub use image_collection::{CollectionError, CollectionState, ImageCollection, ImageRecord};
pub use product::{CategorySummary, Product, ProductDraft, ProductError};
pub use category::{Category, CategoryDraft, CategoryError};
