//! Transport errors and user-facing formatting.

use std::error::Error as StdError;
use thiserror::Error;

/// Result type for backend calls.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Failures surfaced by a comment backend.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("backend rejected request with code {code}: {message}")]
    Api { code: i64, message: String },
    #[error("session expired; sign in again")]
    Unauthorized,
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response envelope had no data")]
    MissingData,
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    /// Formats the error and its sources into one concise line.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { status, message } => {
                format!("status {status}: {}", normalize_message(message))
            }
            Self::Api { message, .. } => normalize_message(message).to_owned(),
            other => format_error_chain(other),
        }
    }
}

fn normalize_message(message: &str) -> &str {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        "request failed"
    } else {
        trimmed
    }
}

fn format_error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut current = Some(error);
    let mut parts = Vec::new();

    while let Some(err) = current {
        let text = err.to_string();
        if !text.is_empty() && parts.last() != Some(&text) {
            parts.push(text);
        }
        current = err.source();
    }

    if parts.is_empty() {
        "unknown error".to_owned()
    } else {
        parts.join(": ")
    }
}
