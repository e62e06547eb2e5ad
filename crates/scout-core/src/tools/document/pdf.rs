//! download_pdf_as_text tool - fetch a PDF by URL and extract its text

use serde_json::{json, Value};
use tracing::debug;

use crate::config::PdfConfig;
use crate::context::ToolContext;
use crate::error::ToolError;
use crate::formatting::truncate_chars;
use crate::tools::{param_str, param_u64, BoxFuture, Tool, ToolOutput};

const MIN_CHARS: u64 = 500;
const MAX_CHARS: u64 = 100_000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Some hosts refuse non-browser agents for PDF downloads
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// Tool for downloading a PDF and returning readable text
pub struct DownloadPdfText {
    config: PdfConfig,
}

impl DownloadPdfText {
    pub fn new(config: PdfConfig) -> Self {
        Self { config }
    }

    fn limit(&self, requested: Option<u64>) -> usize {
        let fallback = if self.config.max_chars == 0 {
            12_000
        } else {
            self.config.max_chars as u64
        };
        requested
            .filter(|n| *n > 0)
            .unwrap_or(fallback)
            .clamp(MIN_CHARS, MAX_CHARS) as usize
    }
}

/// Join non-empty pages (form-feed separated) with blank lines
pub(crate) fn join_pages(raw: &str) -> String {
    raw.split('\u{0C}')
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub(crate) fn is_pdf_response(content_type: &str, url: &str) -> bool {
    content_type.to_lowercase().contains("pdf") || url.to_lowercase().ends_with(".pdf")
}

pub(crate) fn format_extracted(url: &str, full_text: &str, limit: usize) -> String {
    let head = truncate_chars(full_text, limit);
    let body = if head.len() == full_text.len() {
        full_text.to_string()
    } else {
        format!("{}\n\n[truncated]", head.trim_end())
    };
    format!(
        "SUCCESS: Extracted PDF text.\nURL: {}\nCharacters: {}\n\n{}",
        url,
        full_text.chars().count(),
        body
    )
}

impl Tool for DownloadPdfText {
    fn name(&self) -> &str {
        "download_pdf_as_text"
    }

    fn description(&self) -> &str {
        "Download a PDF URL and extract readable text."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "PDF URL to download and parse" },
                "max_chars": { "type": "integer", "description": "Optional max output size" },
                "timeout_seconds": { "type": "integer", "description": "Request timeout in seconds" }
            },
            "required": ["url"]
        })
    }

    fn execute(&self, params: Value, _ctx: ToolContext) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let url = param_str(&params, "url").trim().to_string();
            if url.is_empty() {
                return Err(ToolError::InvalidParams("url cannot be empty".into()));
            }
            let limit = self.limit(param_u64(&params, "max_chars"));
            let timeout = param_u64(&params, "timeout_seconds").unwrap_or(DEFAULT_TIMEOUT_SECS);

            let client = reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(timeout.max(1)))
                .user_agent(BROWSER_USER_AGENT)
                .build()
                .map_err(|e| ToolError::ExecutionFailed(format!("Failed to create client: {}", e)))?;

            let response = client.get(&url).send().await.map_err(|e| {
                if e.is_timeout() {
                    ToolError::Http("PDF download timed out".into())
                } else if e.is_connect() {
                    ToolError::Http("Failed to connect while downloading PDF".into())
                } else {
                    ToolError::from(e)
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(ToolError::Http(format!(
                    "PDF download returned HTTP {}",
                    status.as_u16()
                )));
            }

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_lowercase();
            if !is_pdf_response(&content_type, &url) {
                return Err(ToolError::ExecutionFailed(format!(
                    "URL did not return a PDF content-type. Got: {}",
                    if content_type.is_empty() { "unknown" } else { content_type.as_str() }
                )));
            }

            let bytes = response.bytes().await?;
            debug!(url = %url, bytes = bytes.len(), "Downloaded PDF");

            let raw = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                .await
                .map_err(|e| ToolError::ExecutionFailed(format!("Failed to parse PDF ({})", e)))?
                .map_err(|e| ToolError::ExecutionFailed(format!("Failed to parse PDF ({})", e)))?;

            let full_text = join_pages(&raw);
            if full_text.is_empty() {
                return Err(ToolError::ExecutionFailed(
                    "No extractable text found in PDF".into(),
                ));
            }

            Ok(ToolOutput::success(format_extracted(&url, &full_text, limit))
                .with_metadata("characters", full_text.chars().count()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_clamp() {
        let tool = DownloadPdfText::new(PdfConfig::default());
        assert_eq!(tool.limit(None), 12_000);
        assert_eq!(tool.limit(Some(10)), 500);
        assert_eq!(tool.limit(Some(1_000_000)), 100_000);
        assert_eq!(tool.limit(Some(0)), 12_000);
    }

    #[test]
    fn test_join_pages() {
        assert_eq!(join_pages(" one \u{0C}\n\u{0C} two\n"), "one\n\ntwo");
    }

    #[test]
    fn test_pdf_detection() {
        assert!(is_pdf_response("application/pdf", "https://x.org/paper"));
        assert!(is_pdf_response("", "https://x.org/paper.PDF"));
        assert!(!is_pdf_response("text/html", "https://x.org/paper"));
    }

    #[test]
    fn test_format_extracted_truncates() {
        let text = "a".repeat(600);
        let out = format_extracted("https://x.org/p.pdf", &text, 500);
        assert!(out.starts_with("SUCCESS: Extracted PDF text.\nURL: https://x.org/p.pdf\nCharacters: 600\n\n"));
        assert!(out.ends_with("\n\n[truncated]"));

        let out = format_extracted("u", "short", 500);
        assert!(out.ends_with("\n\nshort"));
    }

    #[tokio::test]
    async fn test_empty_url() {
        let tool = DownloadPdfText::new(PdfConfig::default());
        let text = crate::tools::invoke(&tool, json!({"url": "  "}), ToolContext::standalone()).await;
        assert_eq!(text, "ERROR: url cannot be empty");
    }
}
