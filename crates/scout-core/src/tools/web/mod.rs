//! Web search tools backed by Brave Search and SerpAPI

mod brave;
mod serpapi;

pub use brave::BraveSearch;
pub use serpapi::{
    has_serpapi_keys, is_rate_limited, parse_serpapi_keys, shuffled_serpapi_keys, BingWebSearch,
    GoogleWebSearch, SerpApiClient,
};

use std::time::Duration;

use crate::error::ToolError;

const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// HTTP client with a per-call timeout
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ToolError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .user_agent(concat!("scout/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ToolError::ExecutionFailed(format!("Failed to create client: {}", e)))
}

/// `timeout_seconds` parameter, falling back to the default
pub(crate) fn timeout_param(params: &serde_json::Value) -> u64 {
    crate::tools::param_u64(params, "timeout_seconds").unwrap_or(DEFAULT_TIMEOUT_SECS)
}
