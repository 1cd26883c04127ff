//! Protocol-level error type.

use http::StatusCode;
use partsmith_storage::StorageError;

/// An error that ends request handling with a JSON `{ "error": ... }` body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request is missing or carries an invalid parameter.
    #[error("{0}")]
    Validation(String),

    /// The addressed upload does not exist.
    #[error("{0}")]
    NotFound(String),

    /// No route matches the method and path.
    #[error("Not Found")]
    RouteNotFound,

    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The broker itself failed to produce a response.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// A `Missing "<name>" parameter` validation error.
    #[must_use]
    pub fn missing_param(name: &str) -> Self {
        Self::Validation(format!("Missing \"{name}\" parameter"))
    }

    /// An `Invalid "<name>" parameter` validation error.
    #[must_use]
    pub fn invalid_param(name: &str) -> Self {
        Self::Validation(format!("Invalid \"{name}\" parameter"))
    }

    /// The HTTP status this error maps to.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
