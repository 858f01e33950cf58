//! Adapters for storage collaborators
pub mod blob_store;
pub mod repository;

pub use blob_store::LocalBlobStore;
pub use repository::{InMemoryProductImageRepository, PgProductImageRepository};
