//! Error types for Scout Core

use thiserror::Error;

/// Result type alias using Scout Error
pub type Result<T> = std::result::Result<T, Error>;

/// Scout error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("{0}")]
    InvalidInput(String),

    #[error("agent runtime is not available")]
    RuntimeUnavailable,

    #[error("sub-agent returned an empty response.")]
    EmptyResponse,

    #[error("sub-agent run failed.")]
    NoResult,

    #[error("sub-agent exceeded the maximum of {0} turns")]
    MaxTurns(u32),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),
}

/// Tool-specific errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidParams(String),

    #[error("{0}")]
    ExecutionFailed(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ToolError::Http("request timed out".to_string())
        } else if err.is_connect() {
            ToolError::Http("failed to connect".to_string())
        } else {
            ToolError::Http(err.to_string())
        }
    }
}
