//! brave_search tool - Brave Web Search API

use std::time::Duration;

use rand::Rng;
use serde_json::{json, Value};
use tracing::warn;

use crate::config::BraveConfig;
use crate::context::ToolContext;
use crate::error::ToolError;
use crate::tools::{param_str, param_u64, BoxFuture, Tool, ToolOutput};

use super::{http_client, timeout_param};

const ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";
const MAX_COUNT: u64 = 20;
const MAX_RETRY_JITTER_MS: u64 = 10_000;

/// Tool for searching the web through Brave Search
pub struct BraveSearch {
    config: BraveConfig,
}

impl BraveSearch {
    pub fn new(config: BraveConfig) -> Self {
        Self { config }
    }
}

/// Accept `pd`, `pw`, `pm`, `py` or a `YYYY-MM-DDtoYYYY-MM-DD` range
pub(crate) fn normalize_freshness(value: &str) -> Option<String> {
    let value = value.trim().to_lowercase();
    if matches!(value.as_str(), "pd" | "pw" | "pm" | "py") {
        return Some(value);
    }
    let (from, to) = value.split_once("to")?;
    if is_iso_date(from) && is_iso_date(to) {
        Some(value)
    } else {
        None
    }
}

fn is_iso_date(s: &str) -> bool {
    s.len() == 10 && chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// One line pair per result, in Brave's order
pub(crate) fn format_results(payload: &Value, limit: usize) -> String {
    let lines: Vec<String> = payload["web"]["results"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .take(limit)
                .map(|entry| {
                    let title = entry["title"]
                        .as_str()
                        .filter(|t| !t.is_empty())
                        .unwrap_or("(no title)");
                    let url = entry["url"].as_str().unwrap_or("");
                    let snippet = entry["description"].as_str().unwrap_or("");
                    format!("- {}: {}\n  {}", title, url, snippet)
                })
                .collect()
        })
        .unwrap_or_default();

    if lines.is_empty() {
        "No results.".to_string()
    } else {
        lines.join("\n")
    }
}

impl Tool for BraveSearch {
    fn name(&self) -> &str {
        "brave_search"
    }

    fn description(&self) -> &str {
        "Search Brave Search API and return a short list of results."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query string" },
                "count": { "type": "integer", "description": "Number of results to return (1-20)" },
                "country": { "type": "string", "description": "Country code (e.g. \"US\")" },
                "search_lang": { "type": "string", "description": "Search language (e.g. \"en\")" },
                "ui_lang": { "type": "string", "description": "UI language (e.g. \"en-US\")" },
                "freshness": {
                    "type": "string",
                    "description": "Freshness filter: pd, pw, pm, py, or YYYY-MM-DDtoYYYY-MM-DD"
                },
                "timeout_seconds": { "type": "integer", "description": "Request timeout in seconds" }
            },
            "required": ["query"]
        })
    }

    fn execute(&self, params: Value, _ctx: ToolContext) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let api_key = self
                .config
                .get_api_key()
                .ok_or_else(|| ToolError::ExecutionFailed("Brave API key not configured.".into()))?;

            let query = param_str(&params, "query").trim();
            if query.is_empty() {
                return Err(ToolError::InvalidParams("Query cannot be empty".into()));
            }

            let count = param_u64(&params, "count")
                .unwrap_or(self.config.max_results as u64)
                .clamp(1, MAX_COUNT);

            let freshness = param_str(&params, "freshness").trim();
            let freshness = if freshness.is_empty() {
                None
            } else {
                Some(normalize_freshness(freshness).ok_or_else(|| {
                    ToolError::InvalidParams(
                        "freshness must be one of pd, pw, pm, py, or a range like YYYY-MM-DDtoYYYY-MM-DD"
                            .into(),
                    )
                })?)
            };

            let mut query_params: Vec<(&str, String)> =
                vec![("q", query.to_string()), ("count", count.to_string())];
            for key in ["country", "search_lang", "ui_lang"] {
                let value = param_str(&params, key).trim();
                if !value.is_empty() {
                    query_params.push((key, value.to_string()));
                }
            }
            if let Some(freshness) = freshness {
                query_params.push(("freshness", freshness));
            }

            let client = http_client(timeout_param(&params))?;
            let send = || {
                client
                    .get(ENDPOINT)
                    .header("Accept", "application/json")
                    .header("X-Subscription-Token", api_key.as_str())
                    .query(&query_params)
                    .send()
            };

            let mut response = send().await?;
            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let delay = rand::thread_rng().gen_range(0..=MAX_RETRY_JITTER_MS);
                warn!(delay_ms = delay, "Brave search rate limited; retrying once");
                tokio::time::sleep(Duration::from_millis(delay)).await;
                response = send().await?;
            }

            let status = response.status();
            if !status.is_success() {
                return Err(ToolError::Http(format!(
                    "Brave search returned HTTP {}",
                    status.as_u16()
                )));
            }

            let payload: Value = response.json().await?;
            Ok(ToolOutput::success(format_results(&payload, count as usize)))
        })
    }
}
