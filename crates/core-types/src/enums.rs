use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The user-editable columns of a product row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductField {
    ArticleNo,
    ProductService,
    InPrice,
    Price,
    Unit,
    InStock,
    Description,
}

impl ProductField {
    pub const ALL: [ProductField; 7] = [
        ProductField::ArticleNo,
        ProductField::ProductService,
        ProductField::InPrice,
        ProductField::Price,
        ProductField::Unit,
        ProductField::InStock,
        ProductField::Description,
    ];

    /// The column name, which is also the JSON key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductField::ArticleNo => "article_no",
            ProductField::ProductService => "product_service",
            ProductField::InPrice => "in_price",
            ProductField::Price => "price",
            ProductField::Unit => "unit",
            ProductField::InStock => "in_stock",
            ProductField::Description => "description",
        }
    }

    /// Numeric fields only accept digits when edited inline.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ProductField::InPrice | ProductField::Price | ProductField::InStock
        )
    }
}

impl fmt::Display for ProductField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ProductField::ALL
            .into_iter()
            .find(|field| field.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownField(s.to_string()))
    }
}
