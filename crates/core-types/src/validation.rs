//! Column constraints of the `products` table, checked before any SQL runs.
//!
//! Checks never stop at the first problem: every offending field is collected
//! into [`ValidationErrors`] so that a client can highlight all of them at once.

use crate::enums::ProductField;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of the `VARCHAR(50)` columns.
pub const MAX_SHORT_TEXT_LEN: usize = 50;

/// Scale of the `NUMERIC(10,2)` price columns.
pub const PRICE_SCALE: u32 = 2;

/// Exclusive upper bound of a `NUMERIC(10,2)` value (8 integer digits).
const PRICE_LIMIT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// One rejected field and the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every constraint violation found in one request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: ProductField, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.as_str().to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.0
    }

    /// Whether `field` was rejected.
    pub fn contains(&self, field: ProductField) -> bool {
        self.0.iter().any(|e| e.field == field.as_str())
    }

    /// `Ok(value)` when nothing was collected.
    pub fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validation failed")?;
        for (i, err) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{}", err.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// A required text column: present, and not blank.
pub(crate) fn required_text(
    errors: &mut ValidationErrors,
    field: ProductField,
    value: Option<String>,
) -> Option<String> {
    match value {
        None => {
            errors.push(field, format!("{field} is required"));
            None
        }
        Some(v) => non_empty_text(errors, field, v),
    }
}

/// A text column that must not be blank once it is given.
pub(crate) fn non_empty_text(
    errors: &mut ValidationErrors,
    field: ProductField,
    value: String,
) -> Option<String> {
    if value.trim().is_empty() {
        errors.push(field, format!("{field} cannot be empty"));
        return None;
    }
    max_len(errors, field, value)
}

/// Enforces the `VARCHAR(50)` length, counted in characters like PostgreSQL does.
pub(crate) fn max_len(
    errors: &mut ValidationErrors,
    field: ProductField,
    value: String,
) -> Option<String> {
    let limited = matches!(field, ProductField::ArticleNo | ProductField::Unit);
    if limited && value.chars().count() > MAX_SHORT_TEXT_LEN {
        errors.push(
            field,
            format!("{field} must be at most {MAX_SHORT_TEXT_LEN} characters"),
        );
        return None;
    }
    Some(value)
}

/// A price: non-negative, rounded to two places, within `NUMERIC(10,2)`.
pub(crate) fn amount(
    errors: &mut ValidationErrors,
    field: ProductField,
    value: Decimal,
) -> Option<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        errors.push(field, format!("{field} must be greater than or equal to 0"));
        return None;
    }
    // PostgreSQL rounds half away from zero when storing NUMERIC.
    let mut rounded =
        value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if rounded >= PRICE_LIMIT {
        errors.push(field, format!("{field} must be less than {PRICE_LIMIT}"));
        return None;
    }
    rounded.rescale(PRICE_SCALE);
    Some(rounded)
}

/// A stock count: non-negative.
pub(crate) fn quantity(
    errors: &mut ValidationErrors,
    field: ProductField,
    value: i32,
) -> Option<i32> {
    if value < 0 {
        errors.push(field, format!("{field} must be greater than or equal to 0"));
        return None;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn amounts_are_rounded_to_the_column_scale() {
        let mut errors = ValidationErrors::new();
        let value = amount(&mut errors, ProductField::Price, dec!(12.345));
        assert!(errors.is_empty());
        assert_eq!(value.map(|v| v.to_string()), Some("12.35".to_string()));

        let whole = amount(&mut errors, ProductField::Price, dec!(7));
        assert_eq!(whole.map(|v| v.to_string()), Some("7.00".to_string()));
    }

    #[test]
    fn amounts_outside_the_column_range_are_rejected() {
        let mut errors = ValidationErrors::new();
        assert_eq!(amount(&mut errors, ProductField::InPrice, dec!(-0.01)), None);
        assert_eq!(amount(&mut errors, ProductField::Price, dec!(100000000)), None);
        assert_eq!(
            amount(&mut errors, ProductField::Price, dec!(99999999.99)),
            Some(dec!(99999999.99))
        );
        assert!(errors.contains(ProductField::InPrice));
        assert!(errors.contains(ProductField::Price));
        assert_eq!(errors.errors().len(), 2);
    }

    #[test]
    fn blank_text_and_long_codes_are_rejected() {
        let mut errors = ValidationErrors::new();
        assert_eq!(
            required_text(&mut errors, ProductField::ArticleNo, Some("   ".into())),
            None
        );
        assert_eq!(
            required_text(&mut errors, ProductField::ProductService, None),
            None
        );
        assert_eq!(
            max_len(&mut errors, ProductField::Unit, "x".repeat(51)),
            None
        );
        // Only the VARCHAR(50) columns are length-limited.
        assert!(max_len(&mut errors, ProductField::Description, "x".repeat(500)).is_some());

        let messages: Vec<_> = errors.errors().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "article_no cannot be empty",
                "product_service is required",
                "unit must be at most 50 characters",
            ]
        );
    }

    #[test]
    fn display_lists_every_message() {
        let mut errors = ValidationErrors::new();
        errors.push(ProductField::Price, "price must be greater than or equal to 0");
        errors.push(ProductField::InStock, "in_stock must be greater than or equal to 0");
        assert_eq!(
            errors.to_string(),
            "Validation failed: price must be greater than or equal to 0; \
             in_stock must be greater than or equal to 0"
        );
    }
}
