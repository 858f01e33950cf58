//! Domain services
pub mod catalog_filter;
pub mod image_persistence;
pub mod image_source;

pub use catalog_filter::ProductFilter;
pub use image_persistence::{load_collection, save_collection, ProductImageRepository};
pub use image_source::{BlobStore, ImageSource, StorageError, UploadFile, UploadOutcome, UploadReport};
