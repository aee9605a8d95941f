use crate::{error::AppError, AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use core_types::{
    BannerEndpoints, BulkItemResult, Envelope, HealthReport, NewProduct, Product,
    ProductPatch, ProductQuery, ServiceBanner,
};
use database::ProductStore;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

type ProductId = WithRejection<Path<i32>, AppError>;

/// # GET /api/products
/// Filters by article number and/or product name, newest first, one page at a time.
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(query), _): WithRejection<Query<ProductQuery>, AppError>,
) -> Result<Json<Envelope<Vec<Product>>>, AppError> {
    let page = state
        .store
        .list(&query)
        .await
        .map_err(|e| AppError::from_db("Failed to fetch products", e))?;
    Ok(Json(Envelope::page(
        page.products,
        page.total,
        query.limit(),
        query.offset(),
    )))
}

/// # GET /api/products/:id
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(id), _): ProductId,
) -> Result<Json<Envelope<Product>>, AppError> {
    let product = state
        .store
        .get(id)
        .await
        .map_err(|e| AppError::from_db("Failed to fetch product", e))?;
    Ok(Json(Envelope::ok(product)))
}

/// # POST /api/products
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<NewProduct>, AppError>,
) -> Result<(StatusCode, Json<Envelope<Product>>), AppError> {
    let draft = body.validate()?;
    let product = state
        .store
        .create(draft)
        .await
        .map_err(|e| AppError::from_db("Failed to create product", e))?;

    tracing::info!(id = product.id, article_no = %product.article_no, "Product created.");
    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(product).with_message("Product created successfully")),
    ))
}

/// # PUT /api/products/:id
/// Applies the fields present in the body; absent fields keep their value.
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(id), _): ProductId,
    WithRejection(Json(patch), _): WithRejection<Json<ProductPatch>, AppError>,
) -> Result<Json<Envelope<Product>>, AppError> {
    let changes = patch.validate()?;
    let product = state
        .store
        .update(id, changes)
        .await
        .map_err(|e| AppError::from_db("Failed to update product", e))?;
    Ok(Json(
        Envelope::ok(product).with_message("Product updated successfully"),
    ))
}

/// # DELETE /api/products/:id
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(id), _): ProductId,
) -> Result<Json<Envelope<()>>, AppError> {
    state
        .store
        .delete(id)
        .await
        .map_err(|e| AppError::from_db("Failed to delete product", e))?;

    tracing::info!(id, "Product deleted.");
    Ok(Json(Envelope::done("Product deleted successfully")))
}

/// # PATCH /api/products/bulk
/// Each entry of `updates` succeeds or fails on its own; there is no
/// transaction around the batch.
pub async fn bulk_update(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<Value>, AppError>,
) -> Result<Json<Envelope<()>>, AppError> {
    let Some(updates) = body.get("updates").and_then(Value::as_array) else {
        return Err(AppError::BadRequest("Updates must be an array".to_string()));
    };

    let mut results = Vec::with_capacity(updates.len());
    for item in updates {
        results.push(apply_bulk_item(state.store.as_ref(), item).await);
    }

    let failed = results.iter().filter(|r| !r.success).count();
    tracing::info!(total = results.len(), failed, "Bulk update completed.");
    Ok(Json(
        Envelope::done("Bulk update completed").with_results(results),
    ))
}

async fn apply_bulk_item(store: &dyn ProductStore, item: &Value) -> BulkItemResult {
    let Some(id) = bulk_item_id(item) else {
        return BulkItemResult::failed(None, "Invalid product id");
    };

    // `id` is not a patch field, so the patch ignores it.
    let patch = match ProductPatch::deserialize(item) {
        Ok(patch) => patch,
        Err(e) => return BulkItemResult::failed(Some(id), e.to_string()),
    };
    let changes = match patch.validate() {
        Ok(changes) => changes,
        Err(errors) => return BulkItemResult::failed(Some(id), errors.to_string()),
    };

    match store.update(id, changes).await {
        Ok(product) => BulkItemResult::updated(product),
        Err(e) => {
            let err = AppError::from_db("Failed to update product", e);
            BulkItemResult::failed(Some(id), err.to_string())
        }
    }
}

/// Accepts `"id": 7` as well as `"id": "7"`.
fn bulk_item_id(item: &Value) -> Option<i32> {
    match item.get("id")? {
        Value::Number(n) => n.as_i64().and_then(|id| i32::try_from(id).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// # GET /health
/// 500 with the driver message when the database cannot be reached.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthReport>) {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthReport::healthy())),
        Err(err) => {
            tracing::error!(error = %err, "Health check failed.");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthReport::unhealthy(err.to_string())),
            )
        }
    }
}

/// # GET /
pub async fn root() -> Json<ServiceBanner> {
    Json(ServiceBanner {
        message: "Price List API Server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: BannerEndpoints {
            health: "/health".to_string(),
            products: "/api/products".to_string(),
        },
    })
}
