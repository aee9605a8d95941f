use core_types::FieldError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to reach the API: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status or `success: false`.
    #[error("{message}")]
    Server {
        status: u16,
        message: String,
        details: Vec<FieldError>,
    },

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// `true` when the request never got an answer from the server.
    pub fn is_connection(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Field-level validation messages, if the server sent any.
    pub fn details(&self) -> &[FieldError] {
        match self {
            ApiError::Server { details, .. } => details,
            _ => &[],
        }
    }
}
