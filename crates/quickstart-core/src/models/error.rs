use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "actix")]
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

/// Error surfaced by every collaborator call.
///
/// Carries a short contextual message plus the
/// collaborator's own error text. Only `bad_request` maps to a 4xx; everything
/// else is a 500 with the message as the body.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QuickstartError {
    pub error: String,
    pub error_description: Option<String>,
    /// HTTP status reported by the remote API, when the failure came from one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
}

impl QuickstartError {
    pub fn new(error: &str, description: Option<&str>) -> Self {
        Self {
            error: error.to_string(),
            error_description: description.map(|s| s.to_string()),
            upstream_status: None,
        }
    }

    pub fn bad_request(description: &str) -> Self {
        Self::new("bad_request", Some(description))
    }

    pub fn storage(description: &str) -> Self {
        Self::new("storage_error", Some(description))
    }

    pub fn session(description: &str) -> Self {
        Self::new("session_error", Some(description))
    }

    pub fn oauth(description: &str) -> Self {
        Self::new("oauth_error", Some(description))
    }

    pub fn task_queue(description: &str) -> Self {
        Self::new("task_queue_error", Some(description))
    }

    pub fn config(description: &str) -> Self {
        Self::new("config_error", Some(description))
    }

    /// Failure talking to the remote timeline service.
    pub fn remote(status: Option<u16>, description: &str) -> Self {
        Self {
            upstream_status: status,
            ..Self::new("remote_error", Some(description))
        }
    }

    /// Prefix the description with a short contextual message.
    pub fn context(mut self, context: &str) -> Self {
        let description = match self.error_description.take() {
            Some(d) => format!("{context}: {d}"),
            None => format!("{context}: {}", self.error),
        };
        self.error_description = Some(description);
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.upstream_status == Some(404)
    }

    pub fn is_bad_request(&self) -> bool {
        self.error == "bad_request"
    }
}

impl fmt::Display for QuickstartError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_description {
            Some(description) => f.write_str(description),
            None => f.write_str(&self.error),
        }
    }
}

impl std::error::Error for QuickstartError {}

#[cfg(feature = "actix")]
impl ResponseError for QuickstartError {
    fn status_code(&self) -> StatusCode {
        if self.is_bad_request() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        tracing::error!(error = %self, status = %self.status_code(), "handler returned an error");
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for QuickstartError {
    fn from(err: sqlx::Error) -> Self {
        Self::storage(&err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_prefixes_description() {
        let err = QuickstartError::storage("connection refused").context("Unable to store credential");
        assert_eq!(err.to_string(), "Unable to store credential: connection refused");
    }

    #[test]
    fn remote_not_found_is_detectable() {
        assert!(QuickstartError::remote(Some(404), "missing").is_not_found());
        assert!(!QuickstartError::remote(Some(500), "boom").is_not_found());
        assert!(!QuickstartError::remote(None, "io").is_not_found());
    }
}
