//! Domain events
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Product(ProductEvent),
    Category(CategoryEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: Uuid, name: String },
    Updated { product_id: Uuid },
    ImagesReplaced { product_id: Uuid, count: usize, primary_url: Option<String> },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CategoryEvent {
    Created { category_id: Uuid, slug: String },
    Updated { category_id: Uuid, slug: String },
    Deleted { category_id: Uuid },
}

impl DomainEvent {
    /// NATS subject the event is published on
    pub fn subject(&self) -> &'static str {
        match self {
            DomainEvent::Product(_) => "catalog.events.product",
            DomainEvent::Category(_) => "catalog.events.category",
        }
    }
}
