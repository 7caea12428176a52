//! # Error Handling
//!
//! This module defines the error taxonomy for the whole pipeline and how each
//! error is converted into an HTTP response.
//!
//! ## Key Rust Concepts for Error Handling:
//!
//! ### Result<T, E> Type
//! - **Purpose**: Forces you to handle both success and failure cases
//! - **No exceptions**: Rust doesn't have try/catch, it uses Result instead
//!
//! ### Enums for Error Types
//! - **Variants**: Each variant below maps to one stage of the pipeline that
//!   can fail (validation, storage, transcription, analysis)
//! - **Data**: Each variant carries the human-readable detail string
//!
//! ### Traits for Error Conversion
//! - **From trait**: Automatically converts between error types with `?`
//! - **ResponseError trait**: Converts errors to HTTP responses
//! - **Display trait**: Defines how errors are formatted as strings
//!
//! ## Propagation policy:
//! - `Validation` is raised before any network call is made (400)
//! - `Storage`, `Transcription`, `Analysis`, `Config`, `Internal` are server
//!   failures (500) with the stage visible in the error type field
//! - `MalformedPayload` is soft: the sentiment handler converts it into a
//!   degraded 200 response, so it normally never reaches a client as an
//!   error status

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Custom error types for the application, one variant per failure stage.
///
/// ## Error Categories:
/// - **Validation**: missing/invalid client input, no outbound call made (400)
/// - **Storage**: filesystem write/mkdir failures, includes the path (500)
/// - **Transcription**: network or non-2xx from the speech service (500)
/// - **Analysis**: network or non-2xx from the completion service (500)
/// - **MalformedPayload**: JSON extraction failed; soft and recoverable
/// - **Config**: configuration loading/validation problems (500)
/// - **Internal**: everything else server-side (500)
#[derive(Debug)]
pub enum AppError {
    /// Client sent invalid or missing data
    Validation(String),

    /// Filesystem write, mkdir or rename failure while persisting audio
    Storage(String),

    /// The external transcription service failed or answered non-2xx
    Transcription(String),

    /// The external completion service failed or answered non-2xx
    Analysis(String),

    /// A brace span was found but did not parse as JSON (soft failure)
    MalformedPayload(String),

    /// Configuration file or environment variable problems
    Config(String),

    /// Internal server errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage failure: {}", msg),
            AppError::Transcription(msg) => write!(f, "Transcription failed: {}", msg),
            AppError::Analysis(msg) => write!(f, "Sentiment analysis failed: {}", msg),
            AppError::MalformedPayload(msg) => write!(f, "Malformed payload: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

/// Converts our errors into the HTTP responses clients see.
///
/// ## HTTP Status Code Mapping:
/// - Validation → 400 (Bad Request)
/// - Storage/Transcription/Analysis/Config/Internal → 500
/// - MalformedPayload → 500 if it ever escapes (handlers normally degrade it)
///
/// ## JSON Response Format:
/// All errors return JSON with a consistent structure:
/// ```json
/// {
///   "error": {
///     "type": "transcription_failed",
///     "message": "Transcription failed: upstream returned 503",
///     "timestamp": "2025-01-01T12:00:00Z"
///   }
/// }
/// ```
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type) = match self {
            AppError::Validation(_) => {
                (actix_web::http::StatusCode::BAD_REQUEST, "validation_error")
            }
            AppError::Storage(_) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "storage_failure",
            ),
            AppError::Transcription(_) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "transcription_failed",
            ),
            AppError::Analysis(_) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "analysis_failed",
            ),
            AppError::MalformedPayload(_) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "malformed_payload",
            ),
            AppError::Config(_) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
            ),
            AppError::Internal(_) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
            ),
        };

        // The full Display string carries the stage prefix (for example
        // "Transcription failed: ...") so the caller can tell which stage
        // of the pipeline broke.
        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

/// Anyhow errors are general server-side problems.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// JSON parsing errors are almost always caused by a malformed client body,
/// so they map to a 400, not a 500.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Type alias for Results that use our custom error type.
pub type AppResult<T> = Result<T, AppError>;
