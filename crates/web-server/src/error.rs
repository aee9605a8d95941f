use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use core_types::{Envelope, ValidationErrors};
use database::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(ValidationErrors),
    #[error("Article number already exists")]
    Duplicate,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("Product not found")]
    NotFound,
    #[error("{action}: {message}")]
    Internal {
        action: &'static str,
        message: String,
    },
}

impl AppError {
    /// Sorts a store failure into a client error or a fault of `action`.
    pub fn from_db(action: &'static str, err: DbError) -> Self {
        match err {
            DbError::NotFound => AppError::NotFound,
            DbError::UniqueViolation(_) => AppError::Duplicate,
            DbError::CheckViolation(constraint) => {
                AppError::BadRequest(format!("Constraint violated: {constraint}"))
            }
            other => AppError::Internal {
                action,
                message: other.to_string(),
            },
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge(rejection.body_text());
        }
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Converts our custom `AppError` into an enveloped HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Envelope::<()>::failure("Validation failed").with_details(errors.into_errors()),
            ),
            AppError::Duplicate => (
                StatusCode::BAD_REQUEST,
                Envelope::failure("Article number already exists"),
            ),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, Envelope::failure(message)),
            AppError::PayloadTooLarge(message) => {
                (StatusCode::PAYLOAD_TOO_LARGE, Envelope::failure(message))
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, Envelope::failure("Product not found")),
            AppError::Internal { action, message } => {
                tracing::error!(error = %message, "{action}.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Envelope::failure(action).with_message(message),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_client_errors() {
        assert!(matches!(
            AppError::from_db("Failed to fetch product", DbError::NotFound),
            AppError::NotFound
        ));
        assert!(matches!(
            AppError::from_db("Failed to create product", DbError::UniqueViolation("k".into())),
            AppError::Duplicate
        ));
    }
}
