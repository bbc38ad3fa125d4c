//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and how port
//! errors surface as HTTP responses.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use life_engine_core::ports::PortError;
use serde_json::json;
use tracing::error;

/// What every failed generative flow shows the user.
pub const FLOW_FAILURE_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error from running the schema migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Maps a port error from a data operation onto a status and message.
pub fn port_error_response(e: PortError) -> Response {
    match e {
        PortError::Validation(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": errors })),
        )
            .into_response(),
        PortError::NotFound(message) => (StatusCode::NOT_FOUND, message).into_response(),
        PortError::Unauthorized => {
            (StatusCode::BAD_REQUEST, "Invalid x-user-id header".to_string()).into_response()
        }
        PortError::MalformedResponse(message) | PortError::Unexpected(message) => {
            error!("Request failed: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            )
                .into_response()
        }
    }
}

/// Maps a generative flow failure. Model and parsing failures collapse into
/// one generic message.
pub fn flow_error_response(e: PortError) -> Response {
    match e {
        PortError::Validation(_) | PortError::NotFound(_) | PortError::Unauthorized => {
            port_error_response(e)
        }
        PortError::MalformedResponse(message) | PortError::Unexpected(message) => {
            error!("Generative flow failed: {}", message);
            (StatusCode::BAD_GATEWAY, FLOW_FAILURE_MESSAGE.to_string()).into_response()
        }
    }
}
