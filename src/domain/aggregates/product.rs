//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::image_collection::{ImageCollection, ImageRecord};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::{InquiryContext, ValueError, WhatsAppLink};

/// Admin form input for creating or editing a product
#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct ProductDraft {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "description must be at most 500 characters"))]
    pub description: Option<String>,
    pub category_id: Uuid,
    #[validate(url(message = "invalid WhatsApp link"))]
    pub whatsapp_link: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[validate(range(min = 0, message = "display order must be positive"))]
    #[serde(default)]
    pub display_order: i32,
}

fn default_active() -> bool { true }

impl ProductDraft {
    /// Trims text fields and turns empty optionals into `None`.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.description = self.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());
        self.whatsapp_link = self.whatsapp_link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary { pub id: Uuid, pub name: String }

#[derive(Clone, Debug, Serialize)]
pub struct Product {
    id: Uuid,
    name: String,
    description: Option<String>,
    category_id: Uuid,
    category: Option<CategorySummary>,
    image_url: Option<String>,
    whatsapp_link: Option<String>,
    is_active: bool,
    display_order: i32,
    images: ImageCollection,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Product {
    /// Validates the draft and builds a new product with an empty image collection.
    pub fn create(draft: ProductDraft) -> Result<Self, ProductError> {
        let draft = draft.normalized();
        draft.validate()?;
        let id = Uuid::now_v7();
        let now = Utc::now();
        let mut product = Self {
            id, name: draft.name.clone(), description: draft.description, category_id: draft.category_id,
            category: None, image_url: None, whatsapp_link: draft.whatsapp_link, is_active: draft.is_active,
            display_order: draft.display_order, images: ImageCollection::new(Some(id), draft.name),
            created_at: now, updated_at: now, events: vec![],
        };
        product.raise_event(DomainEvent::Product(ProductEvent::Created { product_id: id, name: product.name.clone() }));
        Ok(product)
    }

    /// Rebuilds a product from stored data; missing relationships default to empty.
    pub fn restore(row: crate::ProductRow, category: Option<CategorySummary>, images: Vec<ImageRecord>) -> Self {
        let images = ImageCollection::seeded(Some(row.id), row.name.clone(), images);
        Self {
            id: row.id, name: row.name, description: row.description, category_id: row.category_id,
            category, image_url: row.image_url.filter(|u| !u.trim().is_empty()), whatsapp_link: row.whatsapp_link,
            is_active: row.is_active, display_order: row.display_order, images,
            created_at: row.created_at, updated_at: row.updated_at, events: vec![],
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn description(&self) -> Option<&str> { self.description.as_deref() }
    pub fn category_id(&self) -> Uuid { self.category_id }
    pub fn category(&self) -> Option<&CategorySummary> { self.category.as_ref() }
    pub fn category_name(&self) -> Option<&str> { self.category.as_ref().map(|c| c.name.as_str()) }
    pub fn whatsapp_link(&self) -> Option<&str> { self.whatsapp_link.as_deref() }
    pub fn is_active(&self) -> bool { self.is_active }
    pub fn display_order(&self) -> i32 { self.display_order }
    pub fn images(&self) -> &ImageCollection { &self.images }
    pub fn images_mut(&mut self) -> &mut ImageCollection { &mut self.images }

    /// Cover shown in listings: the primary image, else the legacy single image.
    pub fn cover_url(&self) -> Option<&str> {
        self.images.primary().map(|i| i.url.as_str()).or(self.image_url.as_deref())
    }

    pub fn update(&mut self, draft: ProductDraft) -> Result<(), ProductError> {
        let draft = draft.normalized();
        draft.validate()?;
        if self.category_id != draft.category_id { self.category = None; }
        self.images.set_parent_name(draft.name.clone());
        self.name = draft.name;
        self.description = draft.description;
        self.category_id = draft.category_id;
        self.whatsapp_link = draft.whatsapp_link;
        self.is_active = draft.is_active;
        self.display_order = draft.display_order;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::Updated { product_id: self.id }));
        Ok(())
    }

    pub fn deactivate(&mut self) { self.is_active = false; self.touch(); }

    /// Swaps in a saved collection and records the replacement.
    pub fn replace_images(&mut self, images: ImageCollection) {
        let primary_url = images.primary().map(|i| i.url.clone());
        let count = images.len();
        self.images = images;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::ImagesReplaced { product_id: self.id, count, primary_url }));
    }

    /// Staff-provided link if set, otherwise a prefilled inquiry to the store number.
    pub fn inquiry_link(&self, store_number: &str, product_url: Option<&str>) -> Result<WhatsAppLink, ValueError> {
        if let Some(link) = self.whatsapp_link.as_deref() {
            return WhatsAppLink::parse(link);
        }
        let ctx = InquiryContext {
            product_name: &self.name,
            category_name: self.category_name(),
            description: self.description(),
            product_url,
            image_url: self.cover_url(),
        };
        WhatsAppLink::inquiry(store_number, &ctx)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    #[error("invalid product: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str) -> ProductDraft {
        ProductDraft { name: name.into(), category_id: Uuid::new_v4(), is_active: true, ..Default::default() }
    }

    #[test]
    fn test_product_create() {
        let mut p = Product::create(draft("  Bolsa Luna ")).unwrap();
        assert_eq!(p.name(), "Bolsa Luna");
        assert_eq!(p.images().parent_id(), Some(p.id()));
        assert!(matches!(p.take_events().as_slice(), [DomainEvent::Product(ProductEvent::Created { .. })]));
    }

    #[test]
    fn test_draft_validation() {
        assert!(Product::create(draft("   ")).is_err());
        assert!(Product::create(draft(&"x".repeat(101))).is_err());
        let mut bad_link = draft("Bolsa");
        bad_link.whatsapp_link = Some("not a link".into());
        assert!(Product::create(bad_link).is_err());
        let mut blank_link = draft("Bolsa");
        blank_link.whatsapp_link = Some("  ".into());
        assert!(Product::create(blank_link).unwrap().whatsapp_link().is_none());
    }

    #[test]
    fn test_cover_prefers_primary_image() {
        let mut p = Product::create(draft("Bolsa")).unwrap();
        assert_eq!(p.cover_url(), None);
        p.images_mut().add_url("https://x/1.jpg").unwrap();
        p.images_mut().add_url("https://x/2.jpg").unwrap();
        p.images_mut().promote(1).unwrap();
        assert_eq!(p.cover_url(), Some("https://x/2.jpg"));
    }

    #[test]
    fn test_update_renames_default_alt() {
        let mut p = Product::create(draft("Bolsa")).unwrap();
        p.update(draft("Mochila")).unwrap();
        p.images_mut().add_url("https://x/1.jpg").unwrap();
        assert_eq!(p.images().images()[0].alt_text, "Mochila");
    }

    #[test]
    fn test_inquiry_link_prefers_staff_link() {
        let mut d = draft("Bolsa");
        d.whatsapp_link = Some("https://wa.me/5511999999999".into());
        let p = Product::create(d).unwrap();
        assert_eq!(p.inquiry_link("5518996125628", None).unwrap().as_str(), "https://wa.me/5511999999999");
        let p = Product::create(draft("Bolsa")).unwrap();
        assert!(p.inquiry_link("5518996125628", None).unwrap().as_str().starts_with("https://wa.me/5518996125628?text="));
    }
}
