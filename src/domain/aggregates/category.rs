//! Category Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::events::{CategoryEvent, DomainEvent};
use crate::domain::value_objects::{ImageUrl, Slug, ValueError};

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct CategoryDraft {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Generated from the name when absent.
    pub slug: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub cover_image_alt: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub display_order: i32,
}

fn default_active() -> bool { true }

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl CategoryDraft {
    /// Trims text fields and turns empty optionals into `None`.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.slug = non_blank(self.slug);
        self.description = non_blank(self.description);
        self.cover_image_url = non_blank(self.cover_image_url);
        self.cover_image_alt = non_blank(self.cover_image_alt);
        self
    }

    fn slug(&self) -> Result<Slug, ValueError> {
        Slug::from_name(self.slug.as_deref().unwrap_or(&self.name))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Category {
    id: Uuid,
    name: String,
    slug: Slug,
    description: Option<String>,
    cover_image_url: Option<ImageUrl>,
    cover_image_alt: Option<String>,
    is_active: bool,
    display_order: i32,
    created_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Category {
    pub fn create(draft: CategoryDraft) -> Result<Self, CategoryError> {
        let draft = draft.normalized();
        draft.validate()?;
        let slug = draft.slug()?;
        let id = Uuid::now_v7();
        let mut category = Self {
            id, name: draft.name, slug, description: draft.description,
            cover_image_url: None, cover_image_alt: None, is_active: draft.is_active,
            display_order: draft.display_order, created_at: Utc::now(), events: vec![],
        };
        category.apply_cover(draft.cover_image_url, draft.cover_image_alt);
        category.raise_event(DomainEvent::Category(CategoryEvent::Created { category_id: id, slug: category.slug.to_string() }));
        Ok(category)
    }

    /// Rebuilds a category from its stored row.
    pub fn restore(row: crate::CategoryRow) -> Result<Self, CategoryError> {
        let mut category = Self {
            id: row.id, slug: Slug::from_name(&row.slug)?, name: row.name, description: non_blank(row.description),
            cover_image_url: None, cover_image_alt: None, is_active: row.is_active,
            display_order: row.display_order, created_at: row.created_at, events: vec![],
        };
        category.apply_cover(row.cover_image_url, row.cover_image_alt);
        Ok(category)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn slug(&self) -> &Slug { &self.slug }
    pub fn description(&self) -> Option<&str> { self.description.as_deref() }
    pub fn cover_image_url(&self) -> Option<&ImageUrl> { self.cover_image_url.as_ref() }
    pub fn cover_image_alt(&self) -> Option<&str> { self.cover_image_alt.as_deref() }
    pub fn is_active(&self) -> bool { self.is_active }
    pub fn display_order(&self) -> i32 { self.display_order }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// Applies an edited draft; the slug is regenerated from the (new) name unless given.
    pub fn update(&mut self, draft: CategoryDraft) -> Result<(), CategoryError> {
        let draft = draft.normalized();
        draft.validate()?;
        self.slug = draft.slug()?;
        self.name = draft.name;
        self.description = draft.description;
        self.is_active = draft.is_active;
        self.display_order = draft.display_order;
        self.apply_cover(draft.cover_image_url, draft.cover_image_alt);
        self.raise_updated();
        Ok(())
    }

    /// Swaps the cover image, e.g. after an upload. Alt falls back to the category name.
    pub fn set_cover(&mut self, url: ImageUrl, alt: Option<String>) {
        self.cover_image_alt = Some(non_blank(alt).unwrap_or_else(|| self.name.clone()));
        self.cover_image_url = Some(url);
        self.raise_updated();
    }

    /// Flips storefront visibility and returns the new state.
    pub fn toggle_active(&mut self) -> bool {
        self.is_active = !self.is_active;
        self.raise_updated();
        self.is_active
    }

    /// A category may only be deleted once no product points at it.
    pub fn ensure_deletable(&mut self, product_count: i64) -> Result<(), CategoryError> {
        if product_count > 0 {
            return Err(CategoryError::InUse { products: product_count });
        }
        self.raise_event(DomainEvent::Category(CategoryEvent::Deleted { category_id: self.id }));
        Ok(())
    }

    // Alt text only makes sense alongside a cover.
    fn apply_cover(&mut self, url: Option<String>, alt: Option<String>) {
        self.cover_image_url = url.and_then(|u| ImageUrl::new(u).ok());
        self.cover_image_alt = self.cover_image_url.as_ref()
            .map(|_| non_blank(alt).unwrap_or_else(|| self.name.clone()));
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn raise_updated(&mut self) {
        self.raise_event(DomainEvent::Category(CategoryEvent::Updated { category_id: self.id, slug: self.slug.to_string() }));
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    #[error("invalid category: {0}")]
    Invalid(#[from] validator::ValidationErrors),
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error("category still has {products} product(s)")]
    InUse { products: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_generated_from_name() {
        let c = Category::create(CategoryDraft { name: "Bolsas Maternidade".into(), ..Default::default() }).unwrap();
        assert_eq!(c.slug().as_str(), "bolsas-maternidade");
        assert!(c.cover_image_url().is_none());
        assert!(c.cover_image_alt().is_none());
    }

    #[test]
    fn test_cover_alt_defaults_to_name() {
        let c = Category::create(CategoryDraft {
            name: "Mochilas".into(),
            slug: Some("Mochilas Escolares".into()),
            cover_image_url: Some("https://x/capa.jpg".into()),
            ..Default::default()
        }).unwrap();
        assert_eq!(c.slug().as_str(), "mochilas-escolares");
        assert_eq!(c.cover_image_alt(), Some("Mochilas"));
    }

    #[test]
    fn test_invalid_name() {
        assert!(Category::create(CategoryDraft::default()).is_err());
        assert!(matches!(
            Category::create(CategoryDraft { name: "???".into(), ..Default::default() }),
            Err(CategoryError::Value(ValueError::EmptySlug))
        ));
    }

    #[test]
    fn test_blank_name_rejected_even_with_slug() {
        let result = Category::create(CategoryDraft { name: "   ".into(), slug: Some("abc".into()), ..Default::default() });
        assert!(matches!(result, Err(CategoryError::Invalid(_))));
    }

    #[test]
    fn test_name_is_trimmed_and_blank_optionals_dropped() {
        let c = Category::create(CategoryDraft {
            name: "  Necessaires ".into(),
            slug: Some("  ".into()),
            description: Some(" ".into()),
            cover_image_url: Some("https://x/n.jpg".into()),
            cover_image_alt: Some("  ".into()),
            ..Default::default()
        }).unwrap();
        assert_eq!(c.name(), "Necessaires");
        assert_eq!(c.slug().as_str(), "necessaires");
        assert!(c.description().is_none());
        assert_eq!(c.cover_image_alt(), Some("Necessaires"));
    }

    fn stored_row() -> crate::CategoryRow {
        crate::CategoryRow {
            id: Uuid::new_v4(), name: "Bolsas".into(), slug: "bolsas".into(), description: Some("".into()),
            cover_image_url: Some("https://x/b.jpg".into()), cover_image_alt: None, is_active: true,
            display_order: 2, created_at: Utc::now(),
        }
    }

    #[test]
    fn test_restore_from_row() {
        let row = stored_row();
        let mut c = Category::restore(row.clone()).unwrap();
        assert_eq!(c.id(), row.id);
        assert_eq!(c.slug().as_str(), "bolsas");
        assert!(c.description().is_none());
        assert_eq!(c.cover_image_alt(), Some("Bolsas"));
        assert!(c.is_active());
        assert!(c.take_events().is_empty());
    }

    #[test]
    fn test_update_regenerates_slug_and_alt() {
        let mut c = Category::restore(stored_row()).unwrap();
        c.update(CategoryDraft {
            name: "Bolsas Térmicas".into(),
            cover_image_url: Some("https://x/t.jpg".into()),
            is_active: false,
            display_order: 5,
            ..Default::default()
        }).unwrap();
        assert_eq!(c.slug().as_str(), "bolsas-termicas");
        assert_eq!(c.cover_image_url().map(|u| u.as_str()), Some("https://x/t.jpg"));
        assert_eq!(c.cover_image_alt(), Some("Bolsas Térmicas"));
        assert!(!c.is_active());
        assert_eq!(c.display_order(), 5);
        assert!(matches!(c.take_events()[..], [DomainEvent::Category(CategoryEvent::Updated { .. })]));
    }

    #[test]
    fn test_failed_update_leaves_category_unchanged() {
        let mut c = Category::restore(stored_row()).unwrap();
        assert!(c.update(CategoryDraft { name: " ".into(), ..Default::default() }).is_err());
        assert_eq!(c.name(), "Bolsas");
        assert!(c.take_events().is_empty());
    }

    #[test]
    fn test_toggle_active() {
        let mut c = Category::restore(stored_row()).unwrap();
        assert!(!c.toggle_active());
        assert!(c.toggle_active());
        assert_eq!(c.take_events().len(), 2);
    }

    #[test]
    fn test_set_cover() {
        let mut c = Category::restore(stored_row()).unwrap();
        c.set_cover(ImageUrl::new("https://x/nova.jpg").unwrap(), Some("Capa nova".into()));
        assert_eq!(c.cover_image_url().map(|u| u.as_str()), Some("https://x/nova.jpg"));
        assert_eq!(c.cover_image_alt(), Some("Capa nova"));

        c.set_cover(ImageUrl::new("https://x/outra.jpg").unwrap(), None);
        assert_eq!(c.cover_image_alt(), Some("Bolsas"));
    }

    #[test]
    fn test_delete_refused_while_products_reference_it() {
        let mut c = Category::restore(stored_row()).unwrap();
        assert!(matches!(c.ensure_deletable(3), Err(CategoryError::InUse { products: 3 })));
        assert!(c.take_events().is_empty());

        c.ensure_deletable(0).unwrap();
        assert!(matches!(c.take_events()[..], [DomainEvent::Category(CategoryEvent::Deleted { .. })]));
    }
}
