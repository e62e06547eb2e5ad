//! Research tools that delegate to a nested, tool-equipped agent

pub mod scientific;
pub mod websearcher;

pub use scientific::ScientificResearch;
pub use websearcher::WebSearcherResearch;

use std::sync::Arc;

use serde_json::Value;

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::subagent::SubAgentRunner;
use crate::tool_params;
use crate::tools::{param_str, Tool, ToolOutput};

fn prompt_schema(description: &str) -> Value {
    tool_params!(prompt: "string" => description)
}

/// Run the nested agent to completion and return its answer
async fn delegate(
    runner: Arc<SubAgentRunner>,
    params: &Value,
    agent_name: &'static str,
    system_prompt: &'static str,
    tools: Vec<Arc<dyn Tool>>,
    ctx: ToolContext,
) -> Result<ToolOutput, ToolError> {
    let prompt = param_str(params, "prompt");
    let answer = runner
        .run_async(prompt, agent_name, system_prompt, tools, ctx)
        .await
        .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
    Ok(ToolOutput::success(answer).with_metadata("agent", agent_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_schema() {
        let schema = prompt_schema("What to research");
        assert_eq!(schema["properties"]["prompt"]["type"], "string");
        assert_eq!(schema["properties"]["prompt"]["description"], "What to research");
        assert_eq!(schema["required"], serde_json::json!(["prompt"]));
    }
}
