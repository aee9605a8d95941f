use crate::responses::BulkUpdateRequest;
use async_trait::async_trait;
use configuration::ClientSettings;
use core_types::{
    BulkItemResult, BulkUpdateItem, Envelope, HealthReport, NewProduct, Product, ProductPatch,
    ProductQuery,
};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub mod error;
pub mod responses;

// --- Public API ---
pub use error::ApiError;
pub use responses::ProductList;

/// The generic, abstract interface of the price list API.
/// The list view only talks to this trait, allowing the underlying
/// implementation (HTTP or mock) to be swapped out.
#[async_trait]
pub trait ProductApi: Send + Sync {
    /// `GET /products`
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductList, ApiError>;

    /// `GET /products/:id`
    async fn get_product(&self, id: i32) -> Result<Product, ApiError>;

    /// `POST /products`
    async fn create_product(&self, product: &NewProduct) -> Result<Product, ApiError>;

    /// `PUT /products/:id`. Only the fields present in `patch` are sent.
    async fn update_product(&self, id: i32, patch: &ProductPatch) -> Result<Product, ApiError>;

    /// `DELETE /products/:id`
    async fn delete_product(&self, id: i32) -> Result<(), ApiError>;

    /// `PATCH /products/bulk`. Per-item failures are part of the `Ok` value.
    async fn bulk_update(&self, items: &[BulkUpdateItem]) -> Result<Vec<BulkItemResult>, ApiError>;

    /// `GET /health`. An unhealthy server is still an `Ok` report.
    async fn health(&self) -> Result<HealthReport, ApiError>;
}

/// The reqwest implementation of `ProductApi`.
#[derive(Debug, Clone)]
pub struct PriceListClient {
    client: reqwest::Client,
    base_url: String,
}

impl PriceListClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, ApiError> {
        Self::with_timeout(&settings.api_base_url, settings.timeout())
    }

    /// `base_url` includes the `/api` prefix, e.g. `http://localhost:3001/api`.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/health` lives beside `/api`, not under it.
    fn service_root(&self) -> &str {
        self.base_url.strip_suffix("/api").unwrap_or(&self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Envelope<T>, ApiError> {
        let result = Self::execute(request).await;
        if let Err(err) = &result {
            tracing::error!(error = %err, status = ?err.status(), "API request failed.");
        }
        result
    }

    async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> Result<Envelope<T>, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        match serde_json::from_str::<Envelope<T>>(&text) {
            Ok(envelope) if status.is_success() && envelope.success => Ok(envelope),
            Ok(envelope) => Err(ApiError::Server {
                status: status.as_u16(),
                message: envelope
                    .error
                    .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16())),
                details: envelope.details.unwrap_or_default(),
            }),
            Err(_) if !status.is_success() => Err(ApiError::Server {
                status: status.as_u16(),
                message: format!("HTTP error! status: {}", status.as_u16()),
                details: Vec::new(),
            }),
            Err(e) => Err(ApiError::Deserialization(format!(
                "{e}. Original text: {text}"
            ))),
        }
    }
}

fn require_data<T>(envelope: Envelope<T>) -> Result<T, ApiError> {
    envelope
        .data
        .ok_or_else(|| ApiError::Deserialization("response has no `data`".to_string()))
}

#[async_trait]
impl ProductApi for PriceListClient {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductList, ApiError> {
        let request = self.client.get(self.url("/products")).query(query);
        let envelope = self.send::<Vec<Product>>(request).await?;

        let total = envelope.total;
        let limit = envelope.limit.unwrap_or_else(|| query.limit());
        let offset = envelope.offset.unwrap_or_else(|| query.offset());
        let products = require_data(envelope)?;
        Ok(ProductList {
            total: total.unwrap_or(products.len() as i64),
            products,
            limit,
            offset,
        })
    }

    async fn get_product(&self, id: i32) -> Result<Product, ApiError> {
        let request = self.client.get(self.url(&format!("/products/{id}")));
        require_data(self.send(request).await?)
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, ApiError> {
        let request = self.client.post(self.url("/products")).json(product);
        require_data(self.send(request).await?)
    }

    async fn update_product(&self, id: i32, patch: &ProductPatch) -> Result<Product, ApiError> {
        let request = self
            .client
            .put(self.url(&format!("/products/{id}")))
            .json(patch);
        require_data(self.send(request).await?)
    }

    async fn delete_product(&self, id: i32) -> Result<(), ApiError> {
        let request = self.client.delete(self.url(&format!("/products/{id}")));
        self.send::<serde_json::Value>(request).await?;
        Ok(())
    }

    async fn bulk_update(&self, items: &[BulkUpdateItem]) -> Result<Vec<BulkItemResult>, ApiError> {
        let request = self
            .client
            .patch(self.url("/products/bulk"))
            .json(&BulkUpdateRequest { updates: items });
        let envelope = self.send::<serde_json::Value>(request).await?;
        Ok(envelope.results.unwrap_or_default())
    }

    async fn health(&self) -> Result<HealthReport, ApiError> {
        let url = format!("{}/health", self.service_root());
        let response = self.client.get(url).send().await.inspect_err(|err| {
            tracing::error!(error = %err, "Health check request failed.");
        })?;
        let status = response.status();
        let text = response.text().await?;

        serde_json::from_str::<HealthReport>(&text).map_err(|_| ApiError::Server {
            status: status.as_u16(),
            message: format!("HTTP error! status: {}", status.as_u16()),
            details: Vec::new(),
        })
    }
}
