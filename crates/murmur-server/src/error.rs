//! Server error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use murmur_proto::ErrorResponse;
use thiserror::Error;

/// Rejection of a single relay request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Missing, empty or oversized field.
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

/// Errors that stop the relay process.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Socket bind or serve failure
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}
