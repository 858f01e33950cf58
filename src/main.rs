//! Ricca Baby Catalog - storefront and admin API

use anyhow::Result;
use axum::{extract::{DefaultBodyLimit, Multipart, Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use ricca_catalog::config::Config;
use ricca_catalog::domain::aggregates::{Category, CategoryDraft, CategoryError, CategorySummary, ImageCollection, ImageRecord, Product, ProductDraft};
use ricca_catalog::domain::events::DomainEvent;
use ricca_catalog::domain::services::{save_collection, BlobStore, ImageSource, ProductFilter, ProductImageRepository, StorageError, UploadFile, UploadReport};
use ricca_catalog::domain::value_objects::{ImageUrl, WhatsAppLink};
use ricca_catalog::infrastructure::{LocalBlobStore, PgProductImageRepository};
use ricca_catalog::{CatalogError, CategoryRow, ProductRow};

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub nats: Option<async_nats::Client>,
    pub images: Arc<PgProductImageRepository>,
    pub uploads: Arc<ImageSource<LocalBlobStore>>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;
    let db = PgPoolOptions::new().max_connections(10).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => { tracing::warn!(error = %e, "NATS unavailable, events will only be logged"); None }
        },
        None => None,
    };
    let blobs = LocalBlobStore::new(&config.upload_dir, &config.public_base_url, config.max_upload_bytes);
    blobs.ensure_root().await?;
    let state = AppState {
        images: Arc::new(PgProductImageRepository::new(db.clone())),
        uploads: Arc::new(ImageSource::new(blobs)),
        db, nats, config: Arc::new(config.clone()),
    };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "ricca-catalog"})) }))
        .route("/api/v1/products", get(list_products).post(create_product))
        .route("/api/v1/products/:id", get(get_product).put(update_product).delete(delete_product))
        .route("/api/v1/products/:id/images", get(get_images).put(put_images))
        .route("/api/v1/products/:id/images/upload", post(upload_images))
        .route("/api/v1/products/:id/inquiry", get(inquiry_link))
        .route("/api/v1/categories", get(list_categories).post(create_category))
        .route("/api/v1/categories/:id", get(get_category).put(update_category).delete(delete_category))
        .route("/api/v1/categories/:id/active", post(toggle_category))
        .route("/api/v1/categories/:id/cover", post(upload_category_cover))
        .route("/api/v1/categories/:id/products", get(category_products))
        .route("/api/v1/contact", get(contact_link))
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes.saturating_mul(10)))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state);

    tracing::info!("Ricca catalog listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}

type ApiResult<T> = std::result::Result<T, (StatusCode, String)>;

fn status(e: CatalogError) -> (StatusCode, String) {
    let code = match &e {
        CatalogError::InvalidCategory(CategoryError::InUse { .. }) => StatusCode::CONFLICT,
        CatalogError::ProductNotFound | CatalogError::CategoryNotFound | CatalogError::MultiImageDisabled => StatusCode::NOT_FOUND,
        CatalogError::InvalidProduct(_) | CatalogError::InvalidCategory(_) | CatalogError::InvalidValue(_) | CatalogError::Collection(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CatalogError::Storage(_) => StatusCode::BAD_GATEWAY,
        CatalogError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if code.is_server_error() { tracing::error!(error = %e, "request failed"); }
    (code, e.to_string())
}

async fn publish(s: &AppState, events: Vec<DomainEvent>) {
    for event in events {
        tracing::info!(subject = event.subject(), ?event, "domain event");
        let Some(nats) = &s.nats else { continue };
        match serde_json::to_vec(&event) {
            Ok(payload) => if let Err(e) = nats.publish(event.subject().to_string(), payload.into()).await {
                tracing::warn!(error = %e, "failed to publish event");
            },
            Err(e) => tracing::warn!(error = %e, "failed to encode event"),
        }
    }
}

// ----------------------------------------------------------------------------- products

const PRODUCT_SELECT: &str = "SELECT p.*, c.name AS category_name FROM products p LEFT JOIN categories c ON c.id = p.category_id";

#[derive(Debug, sqlx::FromRow)]
struct ProductWithCategory { #[sqlx(flatten)] product: ProductRow, category_name: Option<String> }

impl ProductWithCategory {
    fn into_product(self, images: Vec<ImageRecord>) -> Product {
        let category = self.category_name.map(|name| CategorySummary { id: self.product.category_id, name });
        Product::restore(self.product, category, images)
    }
}

#[derive(Debug, Serialize)]
pub struct ProductView { #[serde(flatten)] product: Product, cover_url: Option<String> }

impl From<Product> for ProductView {
    fn from(product: Product) -> Self { Self { cover_url: product.cover_url().map(str::to_string), product } }
}

async fn load_product(s: &AppState, id: Uuid) -> Result<Product, CatalogError> {
    let row = sqlx::query_as::<_, ProductWithCategory>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
        .bind(id).fetch_optional(&s.db).await?.ok_or(CatalogError::ProductNotFound)?;
    let images = if s.config.multi_image { s.images.list_for_parent(id).await? } else { vec![] };
    Ok(row.into_product(images))
}

/// Active products, optionally restricted to one category, with their galleries.
async fn load_active(s: &AppState, category: Option<Uuid>) -> Result<Vec<Product>, CatalogError> {
    let rows = sqlx::query_as::<_, ProductWithCategory>(&format!("{PRODUCT_SELECT} WHERE p.is_active AND ($1::uuid IS NULL OR p.category_id = $1) ORDER BY p.display_order, p.created_at DESC"))
        .bind(category).fetch_all(&s.db).await?;
    let mut images = if s.config.multi_image {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.product.id).collect();
        s.images.list_for_parents(&ids).await?
    } else { Default::default() };
    Ok(rows.into_iter().map(|r| { let imgs = images.remove(&r.product.id).unwrap_or_default(); r.into_product(imgs) }).collect())
}

async fn save_product_row(s: &AppState, p: &Product, insert: bool) -> Result<(), CatalogError> {
    let sql = if insert {
        "INSERT INTO products (id, name, description, image_url, image_alt, category_id, whatsapp_link, is_active, display_order, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW())"
    } else {
        "UPDATE products SET name = $2, description = $3, image_url = $4, image_alt = $5, category_id = $6, whatsapp_link = $7, is_active = $8, display_order = $9, updated_at = NOW() WHERE id = $1"
    };
    sqlx::query(sql)
        .bind(p.id()).bind(p.name()).bind(p.description()).bind(p.cover_url()).bind(p.name()).bind(p.category_id())
        .bind(p.whatsapp_link()).bind(p.is_active()).bind(p.display_order())
        .execute(&s.db).await?;
    Ok(())
}

#[derive(Debug, Deserialize)] pub struct ListParams { pub search: Option<String>, pub categories: Option<String> }

impl ListParams {
    fn filter(&self) -> ProductFilter {
        let selected_categories = self.categories.as_deref().unwrap_or_default()
            .split(',').filter_map(|c| Uuid::parse_str(c.trim()).ok()).collect();
        ProductFilter { search: self.search.clone().unwrap_or_default(), selected_categories }
    }
}

async fn list_products(State(s): State<AppState>, Query(p): Query<ListParams>) -> ApiResult<Json<Vec<ProductView>>> {
    let products = load_active(&s, None).await.map_err(status)?;
    let filter = p.filter();
    Ok(Json(filter.apply(&products).into_iter().cloned().map(ProductView::from).collect()))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<ProductView>> {
    load_product(&s, id).await.map(|p| Json(ProductView::from(p))).map_err(status)
}

async fn create_product(State(s): State<AppState>, Json(r): Json<ProductDraft>) -> ApiResult<(StatusCode, Json<ProductView>)> {
    let mut product = Product::create(r).map_err(|e| status(e.into()))?;
    save_product_row(&s, &product, true).await.map_err(status)?;
    publish(&s, product.take_events()).await;
    Ok((StatusCode::CREATED, Json(ProductView::from(product))))
}

async fn update_product(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<ProductDraft>) -> ApiResult<Json<ProductView>> {
    let mut product = load_product(&s, id).await.map_err(status)?;
    product.update(r).map_err(|e| status(e.into()))?;
    save_product_row(&s, &product, false).await.map_err(status)?;
    publish(&s, product.take_events()).await;
    Ok(Json(ProductView::from(product)))
}

async fn delete_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let mut product = load_product(&s, id).await.map_err(status)?;
    product.deactivate();
    save_product_row(&s, &product, false).await.map_err(status)?;
    Ok(StatusCode::NO_CONTENT)
}

// ----------------------------------------------------------------------------- images

fn require_multi_image(s: &AppState) -> ApiResult<()> {
    if s.config.multi_image { Ok(()) } else { Err(status(CatalogError::MultiImageDisabled)) }
}

async fn get_images(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Vec<ImageRecord>>> {
    require_multi_image(&s)?;
    let product = load_product(&s, id).await.map_err(status)?;
    Ok(Json(product.images().images().to_vec()))
}

async fn put_images(State(s): State<AppState>, Path(id): Path<Uuid>, Json(records): Json<Vec<ImageRecord>>) -> ApiResult<Json<Vec<ImageRecord>>> {
    require_multi_image(&s)?;
    let mut product = load_product(&s, id).await.map_err(status)?;
    let edited = ImageCollection::seeded(Some(id), product.name(), records);
    let saved = save_collection(s.images.as_ref(), id, edited).await.map_err(status)?;
    product.replace_images(saved);
    save_product_row(&s, &product, false).await.map_err(status)?;
    publish(&s, product.take_events()).await;
    Ok(Json(product.images().images().to_vec()))
}

#[derive(Debug, Serialize)] pub struct UploadResponse { pub uploads: Vec<UploadReport>, pub images: Vec<ImageRecord> }

async fn read_files(multipart: &mut Multipart) -> ApiResult<Vec<UploadFile>> {
    let mut files = vec![];
    while let Some(field) = multipart.next_field().await.map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))? {
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
        let bytes = field.bytes().await.map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        files.push(UploadFile::new(file_name, content_type, bytes.to_vec()));
    }
    require_files(&files)?;
    Ok(files)
}

fn require_files(files: &[UploadFile]) -> ApiResult<()> {
    if files.is_empty() { Err((StatusCode::BAD_REQUEST, "no files uploaded".to_string())) } else { Ok(()) }
}

async fn upload_images(State(s): State<AppState>, Path(id): Path<Uuid>, mut multipart: Multipart) -> ApiResult<Json<UploadResponse>> {
    require_multi_image(&s)?;
    let files = read_files(&mut multipart).await?;

    let mut product = load_product(&s, id).await.map_err(status)?;
    let mut collection = product.images().clone();
    let outcomes = s.uploads.upload_batch(&mut collection, &files).await;
    let saved = save_collection(s.images.as_ref(), id, collection).await.map_err(status)?;
    product.replace_images(saved);
    save_product_row(&s, &product, false).await.map_err(status)?;
    publish(&s, product.take_events()).await;
    Ok(Json(UploadResponse { uploads: outcomes.into_iter().map(UploadReport::from).collect(), images: product.images().images().to_vec() }))
}

#[derive(Debug, Deserialize)] pub struct InquiryParams { pub product_url: Option<String> }

async fn inquiry_link(State(s): State<AppState>, Path(id): Path<Uuid>, Query(q): Query<InquiryParams>) -> ApiResult<Json<serde_json::Value>> {
    let product = load_product(&s, id).await.map_err(status)?;
    let link = product.inquiry_link(&s.config.whatsapp_number, q.product_url.as_deref()).map_err(|e| status(e.into()))?;
    Ok(Json(serde_json::json!({"url": link.as_str()})))
}

/// Store-wide WhatsApp link shown by the floating contact button and footer.
async fn contact_link(State(s): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let link = WhatsAppLink::for_number(&s.config.whatsapp_number).map_err(|e| status(e.into()))?;
    Ok(Json(serde_json::json!({"url": link.as_str()})))
}

// ----------------------------------------------------------------------------- categories

#[derive(Debug, Deserialize)] pub struct CategoryListParams { pub include_inactive: Option<bool> }

async fn list_categories(State(s): State<AppState>, Query(q): Query<CategoryListParams>) -> ApiResult<Json<Vec<CategoryRow>>> {
    let cats = sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE is_active OR $1 ORDER BY display_order, name")
        .bind(q.include_inactive.unwrap_or(false))
        .fetch_all(&s.db).await.map_err(|e| status(e.into()))?;
    Ok(Json(cats))
}

async fn load_category(s: &AppState, id: Uuid) -> Result<Category, CatalogError> {
    let row = sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE id = $1")
        .bind(id).fetch_optional(&s.db).await?.ok_or(CatalogError::CategoryNotFound)?;
    Ok(Category::restore(row)?)
}

async fn save_category_row(s: &AppState, c: &Category, insert: bool) -> Result<CategoryRow, CatalogError> {
    let sql = if insert {
        "INSERT INTO categories (id, name, slug, description, cover_image_url, cover_image_alt, is_active, display_order, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *"
    } else {
        "UPDATE categories SET name = $2, slug = $3, description = $4, cover_image_url = $5, cover_image_alt = $6, is_active = $7, display_order = $8 WHERE id = $1 RETURNING *"
    };
    let mut query = sqlx::query_as::<_, CategoryRow>(sql)
        .bind(c.id()).bind(c.name()).bind(c.slug().as_str()).bind(c.description())
        .bind(c.cover_image_url().map(|u| u.as_str())).bind(c.cover_image_alt()).bind(c.is_active()).bind(c.display_order());
    if insert { query = query.bind(c.created_at()); }
    Ok(query.fetch_one(&s.db).await?)
}

async fn get_category(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Category>> {
    load_category(&s, id).await.map(Json).map_err(status)
}

async fn create_category(State(s): State<AppState>, Json(r): Json<CategoryDraft>) -> ApiResult<(StatusCode, Json<CategoryRow>)> {
    let mut category = Category::create(r).map_err(|e| status(e.into()))?;
    let row = save_category_row(&s, &category, true).await.map_err(status)?;
    publish(&s, category.take_events()).await;
    Ok((StatusCode::CREATED, Json(row)))
}

async fn update_category(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<CategoryDraft>) -> ApiResult<Json<CategoryRow>> {
    let mut category = load_category(&s, id).await.map_err(status)?;
    category.update(r).map_err(|e| status(e.into()))?;
    let row = save_category_row(&s, &category, false).await.map_err(status)?;
    publish(&s, category.take_events()).await;
    Ok(Json(row))
}

async fn toggle_category(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<CategoryRow>> {
    let mut category = load_category(&s, id).await.map_err(status)?;
    category.toggle_active();
    let row = save_category_row(&s, &category, false).await.map_err(status)?;
    publish(&s, category.take_events()).await;
    Ok(Json(row))
}

async fn upload_category_cover(State(s): State<AppState>, Path(id): Path<Uuid>, mut multipart: Multipart) -> ApiResult<Json<CategoryRow>> {
    let mut category = load_category(&s, id).await.map_err(status)?;
    let files = read_files(&mut multipart).await?;
    let file = &files[0];
    let url = s.uploads.store().store(file).await.map_err(|e| status(e.into()))?;
    let url = ImageUrl::new(url).map_err(|_| status(StorageError::EmptyUrl(file.file_name.clone()).into()))?;
    category.set_cover(url, None);
    let row = save_category_row(&s, &category, false).await.map_err(status)?;
    publish(&s, category.take_events()).await;
    Ok(Json(row))
}

/// Hard delete, refused while any product (active or not) still belongs to the category.
async fn delete_category(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let mut category = load_category(&s, id).await.map_err(status)?;
    let mut tx = s.db.begin().await.map_err(|e| status(e.into()))?;
    // Product inserts take a key-share lock on the category row, so none can slip in until commit.
    sqlx::query("SELECT id FROM categories WHERE id = $1 FOR UPDATE").bind(id).execute(&mut *tx).await.map_err(|e| status(e.into()))?;
    let (products,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE category_id = $1")
        .bind(id).fetch_one(&mut *tx).await.map_err(|e| status(e.into()))?;
    category.ensure_deletable(products).map_err(|e| status(e.into()))?;
    sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(&mut *tx).await.map_err(|e| status(e.into()))?;
    tx.commit().await.map_err(|e| status(e.into()))?;
    publish(&s, category.take_events()).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn category_products(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Vec<ProductView>>> {
    sqlx::query("SELECT 1 FROM categories WHERE id = $1").bind(id).fetch_optional(&s.db).await
        .map_err(|e| status(e.into()))?.ok_or_else(|| status(CatalogError::CategoryNotFound))?;
    let products = load_active(&s, Some(id)).await.map_err(status)?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}
