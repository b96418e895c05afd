//! Gateway error taxonomy and its HTTP rendering.
//!
//! [`DataObjectError`] is the only error the gateway returns.  It never
//! carries provider types; provider failures are folded into it by
//! [`crate::gateway::classify`].  [`ApiError`] wraps it for axum handlers
//! and is the single place where kinds become HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Generate a 16-character hex request ID.
pub fn generate_request_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes).to_uppercase()
}

/// Flat classification of [`DataObjectError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidParam,
    Client,
    Service,
    DataObject,
    DataObjectNotFound,
    KeyNotFound,
    AccessDenied,
}

impl ErrorKind {
    /// Stable snake_case label, used in metrics and JSON error bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidParam => "invalid_param",
            ErrorKind::Client => "client_error",
            ErrorKind::Service => "service_error",
            ErrorKind::DataObject => "data_object_error",
            ErrorKind::DataObjectNotFound => "data_object_not_found",
            ErrorKind::KeyNotFound => "key_not_found",
            ErrorKind::AccessDenied => "access_denied",
        }
    }
}

/// Errors returned by [`crate::gateway::DataObjectGateway`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataObjectError {
    /// Caller input failed local validation.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Local or transport failure before the request reached the provider.
    #[error("client error: {0}")]
    Client(String),

    /// Provider-side failure reported by the service.
    #[error("service error: {0}")]
    Service(String),

    /// Object-level failure not otherwise classified.
    #[error("data object error: {0}")]
    DataObject(String),

    /// The container itself does not exist.
    #[error("container not found: {0}")]
    DataObjectNotFound(String),

    /// No object is stored under the key.
    #[error("object not found: {key}")]
    KeyNotFound { key: String },

    /// The object exists but cannot be read or modified by this caller.
    #[error("access denied: {0}")]
    AccessDenied(String),
}

impl DataObjectError {
    /// Build an error of the given kind.  `key` is used for
    /// [`ErrorKind::KeyNotFound`]; every other kind takes `message`.
    pub fn of_kind(kind: ErrorKind, key: Option<&str>, message: String) -> Self {
        match kind {
            ErrorKind::InvalidParam => DataObjectError::InvalidParam(message),
            ErrorKind::Client => DataObjectError::Client(message),
            ErrorKind::Service => DataObjectError::Service(message),
            ErrorKind::DataObject => DataObjectError::DataObject(message),
            ErrorKind::DataObjectNotFound => DataObjectError::DataObjectNotFound(message),
            ErrorKind::KeyNotFound => match key {
                Some(key) => DataObjectError::KeyNotFound {
                    key: key.to_string(),
                },
                None => DataObjectError::DataObject(message),
            },
            ErrorKind::AccessDenied => DataObjectError::AccessDenied(message),
        }
    }

    pub fn key_not_found(key: &str) -> Self {
        DataObjectError::KeyNotFound {
            key: key.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DataObjectError::InvalidParam(_) => ErrorKind::InvalidParam,
            DataObjectError::Client(_) => ErrorKind::Client,
            DataObjectError::Service(_) => ErrorKind::Service,
            DataObjectError::DataObject(_) => ErrorKind::DataObject,
            DataObjectError::DataObjectNotFound(_) => ErrorKind::DataObjectNotFound,
            DataObjectError::KeyNotFound { .. } => ErrorKind::KeyNotFound,
            DataObjectError::AccessDenied(_) => ErrorKind::AccessDenied,
        }
    }
}

/// HTTP-facing wrapper around [`DataObjectError`].
#[derive(Debug)]
pub struct ApiError(pub DataObjectError);

impl ApiError {
    /// Shorthand for a caller error raised by a handler before the gateway
    /// is reached (missing form field, unparseable query value).
    pub fn invalid_param(message: impl Into<String>) -> Self {
        ApiError(DataObjectError::InvalidParam(message.into()))
    }

    pub fn status_code(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::InvalidParam => StatusCode::BAD_REQUEST,
            ErrorKind::AccessDenied => StatusCode::FORBIDDEN,
            ErrorKind::KeyNotFound | ErrorKind::DataObjectNotFound => StatusCode::NOT_FOUND,
            ErrorKind::Client
            | ErrorKind::Service
            | ErrorKind::DataObject => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DataObjectError> for ApiError {
    fn from(err: DataObjectError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.0.kind();

        if status.is_server_error() {
            tracing::warn!(kind = kind.as_str(), "request failed: {}", self.0);
        } else {
            tracing::debug!(kind = kind.as_str(), "request rejected: {}", self.0);
        }

        // Caller errors echo the message so the client can fix the request.
        if status == StatusCode::BAD_REQUEST {
            return (
                status,
                [("content-type", "text/plain; charset=utf-8")],
                self.0.to_string(),
            )
                .into_response();
        }

        let body = serde_json::json!({
            "error": kind.as_str(),
            "message": self.0.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
