//! Storefront search and category filtering over an already loaded product list.

use serde::Deserialize;
use uuid::Uuid;

use crate::domain::aggregates::Product;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ProductFilter {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub selected_categories: Vec<Uuid>,
}

impl ProductFilter {
    pub fn is_active(&self) -> bool { !self.search.trim().is_empty() || !self.selected_categories.is_empty() }

    pub fn clear(&mut self) { *self = Self::default(); }

    /// Adds the category if absent, removes it otherwise.
    pub fn toggle_category(&mut self, id: Uuid) {
        if let Some(pos) = self.selected_categories.iter().position(|c| *c == id) {
            self.selected_categories.remove(pos);
        } else {
            self.selected_categories.push(id);
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        let needle = self.search.trim().to_lowercase();
        let text_match = needle.is_empty()
            || product.name().to_lowercase().contains(&needle)
            || product.description().is_some_and(|d| d.to_lowercase().contains(&needle))
            || product.category_name().is_some_and(|c| c.to_lowercase().contains(&needle));
        let category_match = self.selected_categories.is_empty()
            || self.selected_categories.contains(&product.category_id());
        text_match && category_match
    }

    pub fn apply<'p>(&self, products: &'p [Product]) -> Vec<&'p Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::CategorySummary;
    use crate::ProductRow;
    use chrono::Utc;

    fn product(name: &str, description: Option<&str>, category: &CategorySummary) -> Product {
        let row = ProductRow {
            id: Uuid::new_v4(), name: name.into(), description: description.map(Into::into),
            image_url: None, image_alt: None, category_id: category.id, whatsapp_link: None,
            is_active: true, display_order: 0, created_at: Utc::now(), updated_at: Utc::now(),
        };
        Product::restore(row, Some(category.clone()), vec![])
    }

    fn fixtures() -> (Vec<Product>, CategorySummary, CategorySummary) {
        let bolsas = CategorySummary { id: Uuid::new_v4(), name: "Bolsas Maternidade".into() };
        let mochilas = CategorySummary { id: Uuid::new_v4(), name: "Mochilas".into() };
        let products = vec![
            product("Bolsa Luna", Some("Couro sintético rosé"), &bolsas),
            product("Frasqueira Sol", None, &bolsas),
            product("Mochila Térmica", Some("Bolso térmico"), &mochilas),
        ];
        (products, bolsas, mochilas)
    }

    fn names<'a>(found: &[&'a Product]) -> Vec<&'a str> { found.iter().map(|p| p.name()).collect() }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let (products, _, _) = fixtures();
        let filter = ProductFilter::default();
        assert!(!filter.is_active());
        assert_eq!(filter.apply(&products).len(), 3);
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let (products, _, _) = fixtures();
        let by_description = ProductFilter { search: "ROSÉ".into(), ..Default::default() };
        assert_eq!(names(&by_description.apply(&products)), vec!["Bolsa Luna"]);
        let by_category = ProductFilter { search: "maternidade".into(), ..Default::default() };
        assert_eq!(names(&by_category.apply(&products)), vec!["Bolsa Luna", "Frasqueira Sol"]);
    }

    #[test]
    fn test_categories_and_search_combine() {
        let (products, bolsas, mochilas) = fixtures();
        let mut filter = ProductFilter { search: "térmic".into(), ..Default::default() };
        filter.toggle_category(bolsas.id);
        assert!(filter.apply(&products).is_empty());
        filter.toggle_category(mochilas.id);
        assert_eq!(names(&filter.apply(&products)), vec!["Mochila Térmica"]);
        filter.toggle_category(bolsas.id);
        assert_eq!(filter.selected_categories, vec![mochilas.id]);
        filter.clear();
        assert!(!filter.is_active());
    }
}
