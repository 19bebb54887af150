//! Quill: API error types.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use quill_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    /// Tracing or OpenTelemetry setup failed.
    #[error("telemetry error: {0}")]
    Telemetry(String),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Per-field messages for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<&'static str, String>>,
}

/// Errors a route can return.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A command or query failed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The request body failed validation.
    #[error("{message}")]
    Validation {
        /// Summary message.
        message: String,
        /// Field name to message.
        fields: BTreeMap<&'static str, String>,
    },

    /// The request body could not be parsed.
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    /// A validation failure on a single field.
    #[must_use]
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Validation {
            message: message.clone(),
            fields: BTreeMap::from([(field, message)]),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

fn domain_status(err: &DomainError) -> (StatusCode, &'static str) {
    match err {
        DomainError::AggregateNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        DomainError::ConcurrencyConflict { .. } => (StatusCode::CONFLICT, "concurrency_conflict"),
        DomainError::UnknownEventType(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "unknown_event_type")
        }
        DomainError::HandlerNotRegistered(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "handler_not_registered")
        }
        DomainError::Infrastructure(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Domain(err) => {
                let (status, error) = domain_status(&err);
                if err.is_configuration_error() {
                    tracing::error!(error = %err, "wiring defect");
                } else if status.is_server_error() {
                    tracing::error!(error = %err, "request failed");
                }
                (
                    status,
                    ErrorBody {
                        error,
                        message: err.to_string(),
                        fields: None,
                    },
                )
            }
            Self::Validation { message, fields } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    error: "validation_error",
                    message,
                    fields: Some(fields),
                },
            ),
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "bad_request",
                    message,
                    fields: None,
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}
