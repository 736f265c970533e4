use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::retry::Transient;
use crate::sanitize;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for calls that move whole media files.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The upstream returned a structured, human-readable error.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl HttpError {
    /// Connection-class failures that may succeed when repeated.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HttpError::Timeout(_) | HttpError::Connect(_) | HttpError::Network(_)
        )
    }

    pub fn api(message: impl Into<String>) -> Self {
        HttpError::Api {
            status: 0,
            message: message.into(),
        }
    }
}

impl Transient for HttpError {
    fn is_transient(&self) -> bool {
        HttpError::is_transient(self)
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        // URLs can carry access tokens in their query.
        let e = e.without_url();
        let message = e.to_string();
        if e.is_timeout() {
            HttpError::Timeout(message)
        } else if e.is_connect() {
            HttpError::Connect(message)
        } else if e.is_decode() {
            HttpError::Decode(message)
        } else {
            HttpError::Network(message)
        }
    }
}

/// Builds the shared client used by every adapter.
pub fn build_client() -> Result<reqwest::Client, HttpError> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(HttpError::from)
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Object { message: String },
    Text(String),
}

/// Extracts `{"error": {"message": ..}}` or `{"error": ".."}` from a body.
pub fn upstream_error_message(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    let message = match envelope.error {
        ErrorBody::Object { message } => message,
        ErrorBody::Text(message) => message,
    };
    (!message.trim().is_empty()).then_some(message)
}

/// Converts a non-success response into an [`HttpError`].
pub async fn error_for_status(response: Response) -> Result<Response, HttpError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status, &body))
}

pub fn classify_failure(status: StatusCode, body: &str) -> HttpError {
    match upstream_error_message(body) {
        Some(message) => HttpError::Api {
            status: status.as_u16(),
            message,
        },
        None => HttpError::Status {
            status: status.as_u16(),
            body: sanitize::truncate_message(body, sanitize::MAX_ERROR_LEN),
        },
    }
}

/// Reads a JSON body, turning failures and `{"error": ..}` payloads into
/// errors. Some upstreams report errors with a 200 status.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, HttpError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(classify_failure(status, &body));
    }
    if let Some(message) = upstream_error_message(&body) {
        return Err(HttpError::Api {
            status: status.as_u16(),
            message,
        });
    }
    serde_json::from_str(&body).map_err(|e| HttpError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classes() {
        assert!(HttpError::Timeout("t".into()).is_transient());
        assert!(HttpError::Connect("c".into()).is_transient());
        assert!(HttpError::Network("reset".into()).is_transient());
        assert!(!HttpError::api("Invalid token").is_transient());
        assert!(!HttpError::Status { status: 500, body: String::new() }.is_transient());
        assert!(!HttpError::Decode("x".into()).is_transient());
    }

    #[test]
    fn test_upstream_error_message_shapes() {
        assert_eq!(
            upstream_error_message(r#"{"error":{"message":"Invalid OAuth access token","code":190}}"#).as_deref(),
            Some("Invalid OAuth access token")
        );
        assert_eq!(
            upstream_error_message(r#"{"error":"ffmpeg exited 1"}"#).as_deref(),
            Some("ffmpeg exited 1")
        );
        assert!(upstream_error_message(r#"{"video_id":"1"}"#).is_none());
        assert!(upstream_error_message("<html>").is_none());
    }

    #[test]
    fn test_classify_failure_prefers_upstream_message() {
        let err = classify_failure(StatusCode::BAD_REQUEST, r#"{"error":{"message":"Bad page"}}"#);
        assert_eq!(err.to_string(), "Bad page");

        let err = classify_failure(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(err, HttpError::Status { status: 502, .. }));
    }
}
