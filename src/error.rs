//! # Error Handling
//!
//! This module defines the errors a request handler can return and how each
//! one becomes an HTTP response.
//!
//! ## Key Rust Concepts for Error Handling:
//!
//! ### Result<T, E> Type
//! - Handlers return `Result<HttpResponse, AppError>`
//! - The `?` operator converts lower-level errors through `From` impls
//!
//! ### ResponseError trait
//! - Actix calls `error_response()` whenever a handler returns `Err(AppError)`
//! - `status_code()` picks the HTTP status
//!
//! ## Response shape:
//! Every error renders the same body the front end already understands:
//! ```json
//! { "success": false, "error": "Could not save alert" }
//! ```
//! Storage failures only ever expose their fixed public message. The
//! underlying I/O error is logged by the handler, never sent to the client.

use crate::storage::StorageError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Custom error types for the application.
///
/// ## Error Categories:
/// - **BadRequest**: The body could not be decoded (malformed JSON or multipart) → 400
/// - **ValidationError**: The body decoded but breaks a rule (no audio part, bad extension) → 400
/// - **Storage**: Persisting to disk failed → 500 with a fixed, sanitized message
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),

    ValidationError(String),

    Storage {
        message: &'static str,
        source: StorageError,
    },
}

impl AppError {
    /// Wrap a storage failure behind the message the client is allowed to see.
    pub fn storage(message: &'static str, source: StorageError) -> Self {
        AppError::Storage { message, source }
    }

    /// The text placed in the `error` field of the response body.
    pub fn public_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) | AppError::ValidationError(msg) => msg.clone(),
            AppError::Storage { message, .. } => message.to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::Storage { message, source } => write!(f, "{}: {}", message, source),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Storage { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Converts our errors into HTTP responses.
///
/// ## HTTP Status Code Mapping:
/// - BadRequest / ValidationError → 400 (Bad Request)
/// - Storage → 500 (Internal Server Error)
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": self.public_message(),
        }))
    }
}

/// JSON decoding failures are the client's fault, so they become a 400.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("Invalid JSON body: {}", err))
    }
}

/// Shorthand for `Result<T, AppError>`.
pub type AppResult<T> = Result<T, AppError>;
