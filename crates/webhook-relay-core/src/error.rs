use anyhow::Error as AnyError;
use serde_json::json;
use thiserror::Error;

use crate::body::Body;
use crate::http::{header::CONTENT_TYPE, HeaderValue, Method, Response, StatusCode};
use crate::response::{response_with_body, IntoResponse};

pub const METHOD_NOT_ALLOWED_MESSAGE: &str = "Method not allowed";
pub const CONFIGURATION_MISSING_MESSAGE: &str = "Webhook URL not configured";
pub const MISSING_MESSAGE_MESSAGE: &str = "Message parameter is required";
pub const UPSTREAM_FAILURE_MESSAGE: &str = "Failed to connect to backend";
pub const NOT_FOUND_MESSAGE: &str = "Not found";
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Failure of the single outbound webhook call.
///
/// Every variant is reported to callers as the same generic 500; the detail only reaches logs.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid webhook URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: http::uri::InvalidUri,
    },
    #[error("transport error: {source}")]
    Transport {
        #[source]
        source: AnyError,
    },
    #[error("webhook returned {status}")]
    Status { status: StatusCode },
    #[error("webhook returned invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

impl UpstreamError {
    pub fn transport<E>(error: E) -> Self
    where
        E: Into<AnyError>,
    {
        UpstreamError::Transport {
            source: error.into(),
        }
    }
}

/// Request-level error carrying an HTTP status and a fixed, non-leaking public message.
///
/// `Display` keeps the internal detail for logging; `message()` is what the caller sees.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("method {method} not allowed")]
    MethodNotAllowed { method: Method },
    #[error("webhook URL not configured (key `{key}`)")]
    ConfigurationMissing { key: String },
    #[error("bad request: {message}")]
    BadRequest { message: String },
    #[error("upstream request failed: {source}")]
    Upstream {
        #[from]
        source: UpstreamError,
    },
    #[error("no route matched path: {path}")]
    NotFound { path: String },
    #[error("internal error: {source}")]
    Internal {
        #[from]
        source: AnyError,
    },
}

impl RelayError {
    pub fn method_not_allowed(method: &Method) -> Self {
        RelayError::MethodNotAllowed {
            method: method.clone(),
        }
    }

    pub fn configuration_missing(key: impl Into<String>) -> Self {
        RelayError::ConfigurationMissing { key: key.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        RelayError::BadRequest {
            message: message.into(),
        }
    }

    pub fn missing_message() -> Self {
        Self::bad_request(MISSING_MESSAGE_MESSAGE)
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        RelayError::NotFound { path: path.into() }
    }

    pub fn internal<E>(error: E) -> Self
    where
        E: Into<AnyError>,
    {
        RelayError::Internal {
            source: error.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::ConfigurationMissing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            RelayError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::NotFound { .. } => StatusCode::NOT_FOUND,
            RelayError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            RelayError::MethodNotAllowed { .. } => METHOD_NOT_ALLOWED_MESSAGE.to_string(),
            RelayError::ConfigurationMissing { .. } => CONFIGURATION_MISSING_MESSAGE.to_string(),
            RelayError::BadRequest { message } => message.clone(),
            RelayError::Upstream { .. } => UPSTREAM_FAILURE_MESSAGE.to_string(),
            RelayError::NotFound { .. } => NOT_FOUND_MESSAGE.to_string(),
            RelayError::Internal { .. } => INTERNAL_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message() });

        let body = Body::json(&payload).unwrap_or_else(|_| Body::text(INTERNAL_MESSAGE));
        let mut response = response_with_body(self.status(), body);
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}
