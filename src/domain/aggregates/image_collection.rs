//! Product image collection
//!
//! Editing buffer for the ordered images of one product. After every operation:
//! - `order` values are exactly `0..len` and follow the list sequence
//! - a non-empty collection has exactly one primary image
//! - every record carries a non-empty URL

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::value_objects::ImageUrl;

const TEMP_ID_PREFIX: &str = "temp-";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    pub parent_id: Option<Uuid>,
    pub url: String,
    pub alt_text: String,
    pub order: u32,
    pub is_primary: bool,
}

impl ImageRecord {
    /// Record not yet written to the backend. `order` and `is_primary` are assigned on append.
    pub fn draft(parent_id: Option<Uuid>, url: ImageUrl, alt_text: impl Into<String>) -> Self {
        Self {
            id: format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4()),
            parent_id,
            url: url.into_inner(),
            alt_text: alt_text.into(),
            order: 0,
            is_primary: false,
        }
    }

    pub fn is_persisted(&self) -> bool { !self.id.starts_with(TEMP_ID_PREFIX) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionState { Empty, NonEmpty }

#[derive(Clone, Debug, Serialize)]
pub struct ImageCollection {
    parent_id: Option<Uuid>,
    parent_name: String,
    images: Vec<ImageRecord>,
}

impl ImageCollection {
    pub fn new(parent_id: Option<Uuid>, parent_name: impl Into<String>) -> Self {
        Self { parent_id, parent_name: parent_name.into(), images: vec![] }
    }

    /// Collection for an existing product, loaded from persisted rows.
    pub fn seeded(parent_id: Option<Uuid>, parent_name: impl Into<String>, records: Vec<ImageRecord>) -> Self {
        let mut collection = Self::new(parent_id, parent_name);
        collection.replace_all(records);
        collection
    }

    pub fn parent_id(&self) -> Option<Uuid> { self.parent_id }
    pub fn parent_name(&self) -> &str { &self.parent_name }
    pub fn images(&self) -> &[ImageRecord] { &self.images }
    pub fn len(&self) -> usize { self.images.len() }
    pub fn is_empty(&self) -> bool { self.images.is_empty() }
    pub fn primary(&self) -> Option<&ImageRecord> { self.images.iter().find(|i| i.is_primary) }

    pub fn state(&self) -> CollectionState {
        if self.images.is_empty() { CollectionState::Empty } else { CollectionState::NonEmpty }
    }

    /// Renames the parent; only affects the default alt text of later appends.
    pub fn set_parent_name(&mut self, name: impl Into<String>) { self.parent_name = name.into(); }

    /// Binds the buffer (and every record in it) to a freshly created parent.
    pub fn attach_to(&mut self, parent_id: Uuid) {
        self.parent_id = Some(parent_id);
        for image in &mut self.images { image.parent_id = Some(parent_id); }
    }

    pub fn append(&mut self, url: ImageUrl, alt_text: Option<String>) -> &ImageRecord {
        let alt_text = alt_text.filter(|a| !a.trim().is_empty()).unwrap_or_else(|| self.parent_name.clone());
        let record = ImageRecord::draft(self.parent_id, url, alt_text);
        self.push(record)
    }

    /// Appends an image typed by staff. Blank input is rejected and nothing changes.
    pub fn add_url(&mut self, raw: &str) -> Result<&ImageRecord, CollectionError> {
        let url = ImageUrl::new(raw).map_err(|_| {
            warn!(parent = ?self.parent_id, "rejected blank image url");
            CollectionError::EmptyUrl
        })?;
        Ok(self.append(url, None))
    }

    /// Resets the buffer. Order comes from list position, records without a URL are
    /// dropped, and the first flagged record (or the first record) ends up primary.
    pub fn replace_all(&mut self, records: Vec<ImageRecord>) {
        let before = records.len();
        self.images = records.into_iter().filter(|r| !r.url.trim().is_empty()).collect();
        if self.images.len() != before {
            warn!(dropped = before - self.images.len(), "dropped images without url");
        }
        self.reindex();
        let primary = self.images.iter().position(|i| i.is_primary).unwrap_or(0);
        self.set_primary(primary);
        debug!(parent = ?self.parent_id, count = self.images.len(), "image collection replaced");
    }

    /// Returns false, leaving the collection untouched, when there is nothing above.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.images.len() { return false; }
        self.swap(index, index - 1);
        true
    }

    /// Returns false, leaving the collection untouched, when there is nothing below.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index >= self.images.len().saturating_sub(1) { return false; }
        self.swap(index, index + 1);
        true
    }

    pub fn promote(&mut self, index: usize) -> Result<(), CollectionError> {
        self.check_index(index)?;
        if self.images[index].is_primary { return Ok(()); }
        self.set_primary(index);
        debug!(parent = ?self.parent_id, index, "image promoted to primary");
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<ImageRecord, CollectionError> {
        self.check_index(index)?;
        let removed = self.images.remove(index);
        self.reindex();
        if removed.is_primary && !self.images.is_empty() {
            self.set_primary(0);
        }
        debug!(parent = ?self.parent_id, index, remaining = self.images.len(), "image removed");
        Ok(removed)
    }

    pub fn into_records(self) -> Vec<ImageRecord> { self.images }

    fn push(&mut self, mut record: ImageRecord) -> &ImageRecord {
        let len_before = self.images.len();
        record.order = len_before as u32;
        record.is_primary = len_before == 0;
        debug!(parent = ?self.parent_id, order = record.order, url = %record.url, "image appended");
        self.images.push(record);
        &self.images[len_before]
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.images.swap(a, b);
        self.reindex();
        debug!(parent = ?self.parent_id, from = a, to = b, "image moved");
    }

    fn reindex(&mut self) {
        for (i, image) in self.images.iter_mut().enumerate() { image.order = i as u32; }
    }

    fn set_primary(&mut self, index: usize) {
        for (i, image) in self.images.iter_mut().enumerate() { image.is_primary = i == index; }
    }

    fn check_index(&self, index: usize) -> Result<(), CollectionError> {
        if index < self.images.len() { Ok(()) } else { Err(CollectionError::IndexOutOfBounds { index, len: self.images.len() }) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    #[error("image URL is empty")]
    EmptyUrl,
    #[error("image index {index} out of bounds for {len} images")]
    IndexOutOfBounds { index: usize, len: usize },
}
