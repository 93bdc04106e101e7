use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// No stored token, or the server rejected the one we sent.
    #[error("Session expired - please log in again")]
    SessionExpired,

    #[error("{0}")]
    Validation(String),

    #[error("Request failed ({status}): {message}")]
    RequestFailed { status: StatusCode, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Deserialize)]
struct Problem {
    detail: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Build an error for a non-success response.
    ///
    /// Uses the server's `detail` when the body carries one, otherwise
    /// `fallback`. Authenticated calls never get here with a 401; the
    /// wrapper turns those into `SessionExpired` first.
    pub fn from_status(status: StatusCode, body: &str, fallback: &str) -> Self {
        let message = serde_json::from_str::<Problem>(body)
            .ok()
            .and_then(|p| p.detail)
            .filter(|d| !d.trim().is_empty())
            .map(|d| Self::truncate_body(&d))
            .unwrap_or_else(|| fallback.to_string());
        ApiError::RequestFailed { status, message }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }

    /// Short message suitable for showing next to the failed action.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::SessionExpired => "Logged out. Please log in again.".to_string(),
            ApiError::Validation(msg) => msg.clone(),
            ApiError::RequestFailed { message, .. } => message.clone(),
            ApiError::Network(e) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            ApiError::Network(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            ApiError::InvalidResponse(_) => "Unexpected response from server.".to_string(),
        }
    }
}
