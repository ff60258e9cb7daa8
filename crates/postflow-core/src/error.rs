//! Error types for the Postflow system

use thiserror::Error;

/// Main error type for all Postflow operations
#[derive(Error, Debug)]
pub enum PostflowError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Duplicate workflow id: {0}")]
    DuplicateWorkflowId(String),

    #[error("Content generation failed: {0}")]
    Generation(String),

    #[error("Approval notification failed: {0}")]
    Notify(String),

    #[error("Publishing to {platform} failed: {reason}")]
    Publish { platform: String, reason: String },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<config::ConfigError> for PostflowError {
    fn from(err: config::ConfigError) -> Self {
        PostflowError::Config(err.to_string())
    }
}

/// Result type for Postflow operations
pub type Result<T> = std::result::Result<T, PostflowError>;
