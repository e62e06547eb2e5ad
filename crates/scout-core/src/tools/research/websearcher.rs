//! websearcher_research tool - broad multi-engine web research

use std::sync::Arc;

use serde_json::Value;

use crate::config::{BraveConfig, SerpApiConfig};
use crate::context::ToolContext;
use crate::error::ToolError;
use crate::subagent::SubAgentRunner;
use crate::tools::web::{has_serpapi_keys, BingWebSearch, BraveSearch, GoogleWebSearch};
use crate::tools::{BoxFuture, Tool, ToolOutput};

use super::{delegate, prompt_schema};

pub const AGENT_NAME: &str = "Web Research Sub-Agent";

/// Model override read when no explicit model is configured
pub const MODEL_ENV: &str = "SCOUT_WEBSEARCHER_AGENT_MODEL";

const SYSTEM_PROMPT: &str = "### ROLE
You are an autonomous Web Research Sub-Agent focused on extensive, evidence-based web research.

### OBJECTIVE
Use the available web tools to gather broad and deep evidence from multiple sources, then produce a concise, factual synthesis.

### OPERATING RULES
- Use multiple search engines (Brave + Google + Bing) and compare findings.
- Prioritize primary/original sources and include relevant URLs in your final answer.
- If sources conflict, explicitly call out the conflict and indicate which sources seem more reliable.
- Never invent facts.
- Never ask the user follow-up questions; do the best possible research autonomously.
";

/// Tool that runs a web-research sub-agent over Brave, Google and Bing
pub struct WebSearcherResearch {
    runner: Arc<SubAgentRunner>,
    brave: BraveConfig,
    serpapi: SerpApiConfig,
}

impl WebSearcherResearch {
    pub fn new(runner: Arc<SubAgentRunner>, brave: BraveConfig, serpapi: SerpApiConfig) -> Self {
        Self {
            runner,
            brave,
            serpapi,
        }
    }

    /// Search tools the nested agent gets, limited to configured backends
    pub fn subagent_tools(&self) -> Vec<Arc<dyn Tool>> {
        let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
        if self.brave.get_api_key().is_some() {
            tools.push(Arc::new(BraveSearch::new(self.brave.clone())));
        }
        if has_serpapi_keys(&self.serpapi.get_api_key().unwrap_or_default()) {
            tools.push(Arc::new(GoogleWebSearch::new(self.serpapi.clone())));
            tools.push(Arc::new(BingWebSearch::new(self.serpapi.clone())));
        }
        tools
    }
}

impl Tool for WebSearcherResearch {
    fn name(&self) -> &str {
        "websearcher_research"
    }

    fn description(&self) -> &str {
        "Run a dedicated web-research sub-agent for extensive web research."
    }

    fn parameters_schema(&self) -> Value {
        prompt_schema("Detailed research request for the sub-agent")
    }

    fn execute(&self, params: Value, ctx: ToolContext) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let tools = self.subagent_tools();
            if tools.is_empty() {
                return Err(ToolError::ExecutionFailed(
                    "Neither Brave API key nor SerpAPI key is configured.".into(),
                ));
            }
            delegate(self.runner.clone(), &params, AGENT_NAME, SYSTEM_PROMPT, tools, ctx).await
        })
    }
}
