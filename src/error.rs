use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// A single CPU or memory quantity that could not be normalized.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuantityError {
    #[error("unknown unit {unit:?} in quantity {quantity:?}")]
    UnknownUnit { quantity: String, unit: String },

    #[error("invalid number in quantity {0:?}")]
    InvalidNumber(String),
}

/// Failures reported by the orchestrator-access collaborator.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("metrics API is not available")]
    MetricsUnavailable,

    /// The API server answered with a non-success status other than 404.
    #[error("GET {what} returned {status}: {body}")]
    Rejected {
        what: String,
        status: u16,
        body: String,
    },

    /// Transport or decoding failure.
    #[error("{0}")]
    Upstream(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        SourceError::Upstream(e.to_string())
    }
}

/// Errors surfaced at the HTTP boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Kubernetes client not initialized")]
    Unavailable,

    #[error("{0}")]
    NotFound(String),

    #[error("Metrics API not available in this cluster")]
    MetricsUnavailable,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Upstream(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unavailable | ApiError::MetricsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SourceError> for ApiError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            SourceError::MetricsUnavailable => ApiError::MetricsUnavailable,
            e @ SourceError::Rejected { .. } => ApiError::Upstream(e.to_string()),
            SourceError::Upstream(msg) => ApiError::Upstream(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
