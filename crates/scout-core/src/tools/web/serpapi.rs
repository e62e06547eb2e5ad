//! Google and Bing web search through SerpAPI
//!
//! A SerpAPI key setting may hold several comma-separated keys. Each request
//! tries them in a fresh random order and moves on to the next key only when
//! the current one is rate limited or out of quota.

use rand::seq::SliceRandom;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::SerpApiConfig;
use crate::context::ToolContext;
use crate::error::ToolError;
use crate::formatting::{normalize_whitespace, snippet};
use crate::tools::{param_str, param_u64, BoxFuture, Tool, ToolOutput};

use super::{http_client, timeout_param};

const ENDPOINT: &str = "https://serpapi.com/search";
const MAX_RESULTS: u64 = 10;
const MAX_PAGE: u64 = 100;
const SNIPPET_CHARS: usize = 240;
const ERROR_BODY_CHARS: usize = 220;

/// Split a comma-separated key setting, dropping blanks and duplicates
pub fn parse_serpapi_keys(raw: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for part in raw.split(',').map(str::trim) {
        if !part.is_empty() && !keys.iter().any(|k| k == part) {
            keys.push(part.to_string());
        }
    }
    keys
}

pub fn has_serpapi_keys(raw: &str) -> bool {
    !parse_serpapi_keys(raw).is_empty()
}

pub fn shuffled_serpapi_keys(raw: &str) -> Vec<String> {
    let mut keys = parse_serpapi_keys(raw);
    keys.shuffle(&mut rand::thread_rng());
    keys
}

/// Whether a SerpAPI failure means "try another key"
pub fn is_rate_limited(status: u16, error_text: &str) -> bool {
    if status == 429 {
        return true;
    }
    let text = error_text.to_lowercase();
    ["rate limit", "too many requests", "searches per month", "insufficient searches"]
        .iter()
        .any(|phrase| text.contains(phrase))
        || (text.contains("quota") && text.contains("exceed"))
}

enum Attempt {
    Done(String),
    RateLimited(String),
}

/// Shared request and formatting logic for both engines
#[derive(Clone)]
pub struct SerpApiClient {
    config: SerpApiConfig,
}

impl SerpApiClient {
    pub fn new(config: SerpApiConfig) -> Self {
        Self { config }
    }

    /// Requested result count clamped to 1..=10, defaulting to the config
    fn max_results(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.config.max_results as u64)
            .clamp(1, MAX_RESULTS)
    }

    async fn search(
        &self,
        engine: &str,
        query: &str,
        extra: Vec<(&'static str, String)>,
        max_results: u64,
        timeout_secs: u64,
    ) -> Result<String, ToolError> {
        let keys = shuffled_serpapi_keys(&self.config.get_api_key().unwrap_or_default());
        if keys.is_empty() {
            return Err(ToolError::ExecutionFailed("SerpAPI key not configured.".into()));
        }

        let client = http_client(timeout_secs)?;
        let mut last_limit = String::new();
        for (index, key) in keys.iter().enumerate() {
            let mut params: Vec<(&str, String)> = vec![
                ("engine", engine.to_string()),
                ("q", query.to_string()),
                ("api_key", key.clone()),
                ("output", "json".to_string()),
            ];
            params.extend(extra.iter().cloned());

            match self.attempt(&client, &params, engine, query, max_results).await? {
                Attempt::Done(text) => return Ok(text),
                Attempt::RateLimited(detail) => {
                    warn!(engine, key_index = index, "SerpAPI key rate limited; rotating");
                    last_limit = detail;
                }
            }
        }
        Err(ToolError::Http(format!(
            "all SerpAPI keys are rate limited ({})",
            last_limit
        )))
    }

    async fn attempt(
        &self,
        client: &reqwest::Client,
        params: &[(&str, String)],
        engine: &str,
        query: &str,
        max_results: u64,
    ) -> Result<Attempt, ToolError> {
        let response = client.get(ENDPOINT).query(params).send().await.map_err(|e| {
            if e.is_timeout() {
                ToolError::Http("SerpAPI request timed out".into())
            } else if e.is_connect() {
                ToolError::Http("Failed to connect to SerpAPI".into())
            } else {
                ToolError::from(e)
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        if status >= 400 {
            let detail = snippet(&body, ERROR_BODY_CHARS);
            if is_rate_limited(status, &body) {
                return Ok(Attempt::RateLimited(format!("HTTP {}", status)));
            }
            return Err(ToolError::Http(if detail.is_empty() {
                format!("SerpAPI returned HTTP {}", status)
            } else {
                format!("SerpAPI returned HTTP {} ({})", status, detail)
            }));
        }

        let payload: Value = serde_json::from_str(&body)
            .map_err(|_| ToolError::ExecutionFailed("SerpAPI returned invalid JSON".into()))?;
        if let Some(error) = payload.get("error").filter(|e| !e.is_null()) {
            let error = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
            if is_rate_limited(status, &error) {
                return Ok(Attempt::RateLimited(error));
            }
            return Err(ToolError::ExecutionFailed(format!("SerpAPI error ({})", error)));
        }

        debug!(engine, query, "SerpAPI search succeeded");
        format_results(&payload, engine, query, max_results as usize).map(Attempt::Done)
    }
}

/// Numbered result list in SerpAPI's order
pub(crate) fn format_results(
    payload: &Value,
    engine: &str,
    query: &str,
    max_results: usize,
) -> Result<String, ToolError> {
    let results = match payload.get("organic_results") {
        None | Some(Value::Null) => return Ok(no_results(query)),
        Some(Value::Array(results)) => results,
        Some(_) => {
            return Err(ToolError::ExecutionFailed(
                "Unexpected SerpAPI response format".into(),
            ))
        }
    };
    if results.is_empty() {
        return Ok(no_results(query));
    }

    let shown: Vec<&Value> = results.iter().take(max_results).collect();
    let mut lines = vec![format!(
        "SUCCESS: SerpAPI {} web results for '{}' (top {}):",
        engine,
        query,
        shown.len()
    )];
    for (idx, item) in shown.iter().enumerate() {
        if !item.is_object() {
            continue;
        }
        let title = text_field(item, &["title"]).unwrap_or("(no title)");
        let url = text_field(item, &["link", "tracking_link"]).unwrap_or("");
        let text = snippet(text_field(item, &["snippet", "description"]).unwrap_or(""), SNIPPET_CHARS);

        let mut meta = Vec::new();
        if let Some(source) = item.get("source").and_then(scalar_text) {
            meta.push(source);
        }
        if let Some(date) = item.get("date").and_then(scalar_text) {
            meta.push(format!("date: {}", date));
        }
        if let Some(position) = item.get("position").and_then(scalar_text) {
            meta.push(format!("pos: {}", position));
        }

        lines.push(format!("{}. {} - {}", idx + 1, title, url));
        if !meta.is_empty() {
            lines.push(format!("   {}", meta.join(" | ")));
        }
        if !text.is_empty() {
            lines.push(format!("   {}", text));
        }
    }
    Ok(lines.join("\n"))
}

fn no_results(query: &str) -> String {
    format!("SUCCESS: No SerpAPI results found for '{}'.", query)
}

fn text_field<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| item.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(normalize_whitespace(s)),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

fn query_and_page(params: &Value) -> Result<(String, u64), ToolError> {
    let query = param_str(params, "query").trim();
    if query.is_empty() {
        return Err(ToolError::InvalidParams("Query cannot be empty".into()));
    }
    let page = param_u64(params, "page").unwrap_or(1).max(1);
    if page > MAX_PAGE {
        return Err(ToolError::InvalidParams(format!(
            "page must be between 1 and {}",
            MAX_PAGE
        )));
    }
    Ok((query.to_string(), page))
}

/// Zero-based Google `start` offset of a 1-based page
fn google_start(page: u64, per_page: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(per_page)
}

/// One-based Bing `first` index of a 1-based page
fn bing_first(page: u64, per_page: u64) -> u64 {
    google_start(page, per_page).saturating_add(1)
}

fn schema(count_field: &str) -> Value {
    let mut properties = json!({
        "query": { "type": "string", "description": "Search query string" },
        "page": { "type": "integer", "description": "Result page (1-100)" },
        "timeout_seconds": { "type": "integer", "description": "Request timeout in seconds" }
    });
    properties[count_field] = json!({
        "type": "integer",
        "description": "Number of results (1-10). Defaults to config value."
    });
    json!({
        "type": "object",
        "properties": properties,
        "required": ["query"]
    })
}

/// search_google_web tool
pub struct GoogleWebSearch {
    client: SerpApiClient,
}

impl GoogleWebSearch {
    pub fn new(config: SerpApiConfig) -> Self {
        Self {
            client: SerpApiClient::new(config),
        }
    }
}

impl Tool for GoogleWebSearch {
    fn name(&self) -> &str {
        "search_google_web"
    }

    fn description(&self) -> &str {
        "Search Google web results via SerpAPI."
    }

    fn parameters_schema(&self) -> Value {
        schema("num")
    }

    fn execute(&self, params: Value, _ctx: ToolContext) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let (query, page) = query_and_page(&params)?;
            let max_results = self.client.max_results(param_u64(&params, "num"));
            let extra = vec![
                ("num", max_results.to_string()),
                ("start", google_start(page, max_results).to_string()),
            ];
            let text = self
                .client
                .search("google", &query, extra, max_results, timeout_param(&params))
                .await?;
            Ok(ToolOutput::success(text))
        })
    }
}

/// search_bing_web tool
pub struct BingWebSearch {
    client: SerpApiClient,
}

impl BingWebSearch {
    pub fn new(config: SerpApiConfig) -> Self {
        Self {
            client: SerpApiClient::new(config),
        }
    }
}

impl Tool for BingWebSearch {
    fn name(&self) -> &str {
        "search_bing_web"
    }

    fn description(&self) -> &str {
        "Search Bing web results via SerpAPI."
    }

    fn parameters_schema(&self) -> Value {
        schema("count")
    }

    fn execute(&self, params: Value, _ctx: ToolContext) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let (query, page) = query_and_page(&params)?;
            let max_results = self.client.max_results(param_u64(&params, "count"));
            let extra = vec![
                ("count", max_results.to_string()),
                ("first", bing_first(page, max_results).to_string()),
            ];
            let text = self
                .client
                .search("bing", &query, extra, max_results, timeout_param(&params))
                .await?;
            Ok(ToolOutput::success(text))
        })
    }
}
