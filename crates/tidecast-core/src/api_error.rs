//! Classification of failed forecast-service calls.

use serde_json::Value;
use thiserror::Error;

use crate::error::ValidationError;
use crate::http_client::{HttpError, HttpErrorKind};

pub const FALLBACK_DETAIL: &str = "request failed";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("server returned {status}: {detail}")]
    Server { status: u16, detail: String },

    #[error("unexpected response body: {message}")]
    Decode { message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ApiError {
    /// Short text suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout { timeout_ms } => format!(
                "The forecast service did not answer within {} s. Try again or raise the timeout.",
                (*timeout_ms as f64 / 1000.0).max(0.001)
            ),
            Self::Network { .. } => String::from(
                "Cannot reach the forecast service. Check the API base URL and that the service is running.",
            ),
            Self::Server { status, detail } if *status == 422 || *status == 400 => {
                format!("The service rejected the request: {detail}")
            }
            Self::Server { status, detail } if *status >= 500 => {
                format!("The forecast service failed ({status}): {detail}")
            }
            Self::Server { status, detail } => format!("Request failed ({status}): {detail}"),
            Self::Decode { .. } => {
                String::from("The forecast service sent a response that could not be read.")
            }
            Self::Validation(error) => format!("Invalid request: {error}"),
        }
    }

    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Pulls a human-readable detail out of a JSON error body.
///
/// Accepts `{"detail": "text"}`, `{"detail": {"msg": .., "type": ..}}` and a
/// list of either; for objects `msg` is preferred over `type`.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    detail_text(value.get("detail")?)
}

fn detail_text(detail: &Value) -> Option<String> {
    match detail {
        Value::String(text) => non_empty(text),
        Value::Array(items) => items.first().and_then(detail_text),
        Value::Object(map) => ["msg", "type"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str).and_then(non_empty)),
        _ => None,
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Maps a non-success response into [`ApiError::Server`].
pub fn map_status(status: u16, body: &str) -> ApiError {
    ApiError::Server {
        status,
        detail: extract_detail(body).unwrap_or_else(|| String::from(FALLBACK_DETAIL)),
    }
}

pub fn map_transport_error(error: &HttpError, timeout_ms: u64) -> ApiError {
    match error.kind() {
        HttpErrorKind::Timeout => ApiError::Timeout { timeout_ms },
        HttpErrorKind::Connect | HttpErrorKind::Other => ApiError::Network {
            message: error.message().to_owned(),
        },
    }
}
