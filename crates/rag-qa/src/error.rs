//! Error types for the question-answering pipeline
//!
//! Every error carries one of five [`ErrorKind`]s. Pipeline stages wrap the
//! errors of the component they drive with [`Error::Stage`]; the kind of a
//! wrapped error is always the kind of the innermost error. Only the transport
//! layers (HTTP, CLI, ingestion trigger) translate kinds into status or exit
//! codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::pipeline::Stage;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed underlying cause attached to service and generation failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classification of errors surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad embedding/model selection or configuration; never retried
    InvalidConfiguration,
    /// Bad caller input
    InvalidArgument,
    /// Transient connectivity, auth or upstream failure; the caller may retry
    ServiceUnavailable,
    /// Missing collection, object or document
    NotFound,
    /// The generative model call failed
    GenerationFailed,
}

impl ErrorKind {
    /// Stable identifier used in JSON error bodies
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration => "invalid_configuration",
            Self::InvalidArgument => "invalid_argument",
            Self::ServiceUnavailable => "service_unavailable",
            Self::NotFound => "not_found",
            Self::GenerationFailed => "generation_failed",
        }
    }

    /// HTTP status code for this kind
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidConfiguration | Self::InvalidArgument => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::GenerationFailed => StatusCode::BAD_GATEWAY,
        }
    }

    /// Process exit code used by the command-line tool
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidConfiguration | Self::InvalidArgument => 2,
            Self::NotFound => 3,
            Self::ServiceUnavailable => 4,
            Self::GenerationFailed => 5,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration (unsupported model, bad template, missing setting)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Invalid caller input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// External service unreachable, unauthorized or failing
    #[error("Service unavailable: {message}")]
    ServiceUnavailable {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Collection, object or document does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generative model call failed
    #[error("Generation failed: {message}")]
    GenerationFailed {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Error raised while a pipeline stage was running
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid configuration error
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a service unavailable error without an attached cause
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create a service unavailable error with the underlying cause
    pub fn service_unavailable_with(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a generation failure with the underlying cause
    pub fn generation(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Self::GenerationFailed {
            message: message.into(),
            source,
        }
    }

    /// Map a transport-level HTTP client error
    pub fn from_http(context: impl Into<String>, err: reqwest::Error) -> Self {
        let context = context.into();
        if err.is_timeout() {
            Self::service_unavailable_with(format!("{}: request timed out", context), err)
        } else if err.is_connect() {
            Self::service_unavailable_with(format!("{}: connection failed", context), err)
        } else if err.is_decode() {
            Self::service_unavailable_with(format!("{}: malformed response", context), err)
        } else {
            Self::service_unavailable_with(context, err)
        }
    }

    /// Map a non-success HTTP status returned by an external service
    pub fn from_status(context: impl Into<String>, status: reqwest::StatusCode, body: &str) -> Self {
        let message = format!("{} ({}): {}", context.into(), status, body.trim());
        match status.as_u16() {
            404 => Self::NotFound(message),
            401 | 403 | 408 | 429 => Self::service_unavailable(message),
            400..=499 => Self::InvalidArgument(message),
            _ => Self::service_unavailable(message),
        }
    }

    /// Wrap this error with the pipeline stage that produced it
    pub fn at_stage(self, stage: Stage) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The outermost stage this error was raised in, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The innermost error, with stage wrappers removed
    pub fn root(&self) -> &Error {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            Self::InvalidArgument(_) | Self::Json(_) => ErrorKind::InvalidArgument,
            Self::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::GenerationFailed { .. } => ErrorKind::GenerationFailed,
            Self::Stage { source, .. } => source.kind(),
            Self::Io(err) if err.kind() == std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            Self::Io(_) => ErrorKind::ServiceUnavailable,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = kind.status_code();

        if status.is_server_error() {
            tracing::error!(kind = %kind, "Request failed: {}", self);
        } else {
            tracing::warn!(kind = %kind, "Request rejected: {}", self);
        }

        let body = Json(json!({
            "error": {
                "type": kind.as_str(),
                "stage": self.stage(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
