use crate::enums::ProductField;
use crate::error::CoreError;
use crate::validation::{self, ValidationErrors};
use crate::{DEFAULT_PAGE_LIMIT, DEFAULT_UNIT};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

/// A row of the `products` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i32,
    pub article_no: String,
    pub product_service: String,
    pub in_price: Decimal,
    pub price: Decimal,
    pub unit: String,
    pub in_stock: i32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Overwrites the fields named by already-validated `changes`.
    pub fn apply(&mut self, changes: &ProductChanges) {
        if let Some(v) = &changes.article_no {
            self.article_no = v.clone();
        }
        if let Some(v) = &changes.product_service {
            self.product_service = v.clone();
        }
        if let Some(v) = changes.in_price {
            self.in_price = v;
        }
        if let Some(v) = changes.price {
            self.price = v;
        }
        if let Some(v) = &changes.unit {
            self.unit = v.clone();
        }
        if let Some(v) = changes.in_stock {
            self.in_stock = v;
        }
        if let Some(v) = &changes.description {
            self.description = v.clone();
        }
    }

    /// Copies whatever `patch` carries without validating it.
    ///
    /// Used for local edit state, which must mirror what the user typed even
    /// when the server would refuse it. Explicit `null` on a required field is
    /// ignored.
    pub fn merge_patch(&mut self, patch: &ProductPatch) {
        if let Some(Some(v)) = &patch.article_no {
            self.article_no = v.clone();
        }
        if let Some(Some(v)) = &patch.product_service {
            self.product_service = v.clone();
        }
        if let Some(Some(v)) = patch.in_price {
            self.in_price = v;
        }
        if let Some(Some(v)) = patch.price {
            self.price = v;
        }
        if let Some(Some(v)) = &patch.unit {
            self.unit = v.clone();
        }
        if let Some(Some(v)) = patch.in_stock {
            self.in_stock = v;
        }
        if let Some(v) = &patch.description {
            self.description = v.clone();
        }
    }

    /// Copies a single field from `other`.
    pub fn copy_field_from(&mut self, other: &Product, field: ProductField) {
        match field {
            ProductField::ArticleNo => self.article_no = other.article_no.clone(),
            ProductField::ProductService => self.product_service = other.product_service.clone(),
            ProductField::InPrice => self.in_price = other.in_price,
            ProductField::Price => self.price = other.price,
            ProductField::Unit => self.unit = other.unit.clone(),
            ProductField::InStock => self.in_stock = other.in_stock,
            ProductField::Description => self.description = other.description.clone(),
        }
    }

    /// The raw text of one field, as an edit box would show it.
    pub fn field_text(&self, field: ProductField) -> String {
        match field {
            ProductField::ArticleNo => self.article_no.clone(),
            ProductField::ProductService => self.product_service.clone(),
            ProductField::InPrice => self.in_price.normalize().to_string(),
            ProductField::Price => self.price.normalize().to_string(),
            ProductField::Unit => self.unit.clone(),
            ProductField::InStock => self.in_stock.to_string(),
            ProductField::Description => self.description.clone().unwrap_or_default(),
        }
    }
}

/// Body of `POST /products`.
///
/// Every field is optional on the wire so that a missing `article_no` shows up
/// as a field-level validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A `NewProduct` that passed validation, with defaults filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub article_no: String,
    pub product_service: String,
    pub in_price: Decimal,
    pub price: Decimal,
    pub unit: String,
    pub in_stock: i32,
    pub description: Option<String>,
}

impl NewProduct {
    pub fn new(article_no: impl Into<String>, product_service: impl Into<String>) -> Self {
        Self {
            article_no: Some(article_no.into()),
            product_service: Some(product_service.into()),
            ..Self::default()
        }
    }

    pub fn validate(self) -> Result<ProductDraft, ValidationErrors> {
        use ProductField::*;
        let mut errors = ValidationErrors::new();

        let article_no = validation::required_text(&mut errors, ArticleNo, self.article_no);
        let product_service =
            validation::required_text(&mut errors, ProductService, self.product_service);
        let in_price = validation::amount(&mut errors, InPrice, self.in_price.unwrap_or_default());
        let price = validation::amount(&mut errors, Price, self.price.unwrap_or_default());
        let unit = validation::max_len(
            &mut errors,
            Unit,
            self.unit.unwrap_or_else(|| DEFAULT_UNIT.to_string()),
        );
        let in_stock = validation::quantity(&mut errors, InStock, self.in_stock.unwrap_or(0));

        match (article_no, product_service, in_price, price, unit, in_stock) {
            (
                Some(article_no),
                Some(product_service),
                Some(in_price),
                Some(price),
                Some(unit),
                Some(in_stock),
            ) if errors.is_empty() => Ok(ProductDraft {
                article_no,
                product_service,
                in_price,
                price,
                unit,
                in_stock,
                description: self.description,
            }),
            _ => Err(errors),
        }
    }
}

impl ProductDraft {
    /// Materialises the draft as a stored row.
    pub fn into_product(self, id: i32, now: DateTime<Utc>) -> Product {
        Product {
            id,
            article_no: self.article_no,
            product_service: self.product_service,
            in_price: self.in_price,
            price: self.price,
            unit: self.unit,
            in_stock: self.in_stock,
            description: self.description,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent key (`None`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Body of `PUT /products/:id`: any subset of the editable fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub article_no: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub product_service: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub in_price: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub price: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub unit: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

/// A `ProductPatch` that passed validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductChanges {
    pub article_no: Option<String>,
    pub product_service: Option<String>,
    pub in_price: Option<Decimal>,
    pub price: Option<Decimal>,
    pub unit: Option<String>,
    pub in_stock: Option<i32>,
    pub description: Option<Option<String>>,
}

impl ProductChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl ProductPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn article_no(mut self, value: impl Into<String>) -> Self {
        self.article_no = Some(Some(value.into()));
        self
    }

    pub fn product_service(mut self, value: impl Into<String>) -> Self {
        self.product_service = Some(Some(value.into()));
        self
    }

    pub fn in_price(mut self, value: Decimal) -> Self {
        self.in_price = Some(Some(value));
        self
    }

    pub fn price(mut self, value: Decimal) -> Self {
        self.price = Some(Some(value));
        self
    }

    pub fn unit(mut self, value: impl Into<String>) -> Self {
        self.unit = Some(Some(value.into()));
        self
    }

    pub fn in_stock(mut self, value: i32) -> Self {
        self.in_stock = Some(Some(value));
        self
    }

    pub fn description(mut self, value: Option<String>) -> Self {
        self.description = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Builds a single-field patch from the text of an edit box.
    ///
    /// Numeric fields keep only their ASCII digits; nothing left means zero.
    /// An empty description clears the column.
    pub fn from_input(field: ProductField, raw: &str) -> Result<Self, CoreError> {
        let patch = Self::new();
        Ok(match field {
            ProductField::ArticleNo => patch.article_no(raw),
            ProductField::ProductService => patch.product_service(raw),
            ProductField::Unit => patch.unit(raw),
            ProductField::Description if raw.is_empty() => patch.description(None),
            ProductField::Description => patch.description(Some(raw.to_string())),
            ProductField::InPrice => patch.in_price(parse_digits(field, raw)?),
            ProductField::Price => patch.price(parse_digits(field, raw)?),
            ProductField::InStock => {
                let digits = digits_only(raw);
                let count = if digits.is_empty() {
                    0
                } else {
                    digits.parse::<i32>().map_err(|e| {
                        CoreError::InvalidInput(field.to_string(), e.to_string())
                    })?
                };
                patch.in_stock(count)
            }
        })
    }

    pub fn validate(self) -> Result<ProductChanges, ValidationErrors> {
        use ProductField::*;
        let mut errors = ValidationErrors::new();

        let article_no = present(&mut errors, ArticleNo, self.article_no)
            .and_then(|v| validation::non_empty_text(&mut errors, ArticleNo, v));
        let product_service = present(&mut errors, ProductService, self.product_service)
            .and_then(|v| validation::non_empty_text(&mut errors, ProductService, v));
        let in_price = present(&mut errors, InPrice, self.in_price)
            .and_then(|v| validation::amount(&mut errors, InPrice, v));
        let price = present(&mut errors, Price, self.price)
            .and_then(|v| validation::amount(&mut errors, Price, v));
        let unit = present(&mut errors, Unit, self.unit)
            .and_then(|v| validation::max_len(&mut errors, Unit, v));
        let in_stock = present(&mut errors, InStock, self.in_stock)
            .and_then(|v| validation::quantity(&mut errors, InStock, v));

        errors.finish(ProductChanges {
            article_no,
            product_service,
            in_price,
            price,
            unit,
            in_stock,
            description: self.description,
        })
    }
}

/// Unwraps a patched required column, flagging an explicit `null`.
fn present<T>(
    errors: &mut ValidationErrors,
    field: ProductField,
    value: Option<Option<T>>,
) -> Option<T> {
    match value {
        Some(None) => {
            errors.push(field, format!("{field} cannot be null"));
            None
        }
        Some(Some(v)) => Some(v),
        None => None,
    }
}

fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

fn parse_digits(field: ProductField, raw: &str) -> Result<Decimal, CoreError> {
    let digits = digits_only(raw);
    if digits.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(&digits).map_err(|e| CoreError::InvalidInput(field.to_string(), e.to_string()))
}

/// One element of the `updates` array of `PATCH /products/bulk`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkUpdateItem {
    pub id: i32,
    #[serde(flatten)]
    pub changes: ProductPatch,
}

/// Query string of `GET /products`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_article: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl ProductQuery {
    /// Article-number filter; an empty string means no filter.
    pub fn article_filter(&self) -> Option<&str> {
        self.search_article.as_deref().filter(|s| !s.is_empty())
    }

    /// Product/service filter; an empty string means no filter.
    pub fn product_filter(&self) -> Option<&str> {
        self.search_product.as_deref().filter(|s| !s.is_empty())
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT)
    }

    pub fn offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }
}
