//! Agent runtime seam: the shapes a nested agent run produces

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ToolContext;
use crate::error::Result;
use crate::tools::{BoxFuture, Tool};

/// Everything needed to construct a nested agent
#[derive(Clone)]
pub struct AgentSpec {
    pub name: String,
    pub instructions: String,
    pub tools: Vec<Arc<dyn Tool>>,
    pub model: Option<String>,
}

impl std::fmt::Debug for AgentSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSpec")
            .field("name", &self.name)
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("model", &self.model)
            .finish()
    }
}

/// One input message for a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMessage {
    pub role: String,
    pub content: String,
}

impl InputMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Token usage reported by one model call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_input_tokens: u64,
}

/// A tool call recorded among the run items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolCallItem {
    /// Function tool call with a direct name
    Named { name: String, call_id: String },
    /// Call whose name sits under a nested `function` object
    Function { function: FunctionRef, call_id: String },
    /// Untyped payload from a runtime we do not model
    Raw(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRef {
    pub name: String,
}

impl ToolCallItem {
    pub fn tool_name(&self) -> Option<String> {
        match self {
            ToolCallItem::Named { name, .. } => non_empty(name),
            ToolCallItem::Function { function, .. } => non_empty(&function.name),
            ToolCallItem::Raw(value) => name_from_value(value),
        }
    }
}

/// Items produced by a run, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunItem {
    ToolCall(ToolCallItem),
    ToolOutput { call_id: String, output: String },
    Message(String),
    Raw(Value),
}

impl RunItem {
    pub fn tool_name(&self) -> Option<String> {
        match self {
            RunItem::ToolCall(call) => call.tool_name(),
            RunItem::Raw(value) => name_from_value(value),
            RunItem::ToolOutput { .. } | RunItem::Message(_) => None,
        }
    }
}

/// Structured output items of one model response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutputItem {
    FunctionCall { name: String, call_id: String },
    /// Provider-hosted tool (web search, code interpreter, ...)
    HostedToolCall { kind: String, tool_name: String },
    Message(String),
    Raw(Value),
}

impl OutputItem {
    pub fn tool_name(&self) -> Option<String> {
        match self {
            OutputItem::FunctionCall { name, .. } => non_empty(name),
            OutputItem::HostedToolCall { kind, tool_name } => {
                non_empty(tool_name).or_else(|| non_empty(kind))
            }
            OutputItem::Message(_) => None,
            OutputItem::Raw(value) => {
                let item_type = value.get("type").and_then(Value::as_str).unwrap_or("");
                if !(item_type.contains("call") || item_type.contains("tool")) {
                    return None;
                }
                name_from_value(value).or_else(|| {
                    value
                        .get("tool_name")
                        .and_then(Value::as_str)
                        .and_then(non_empty)
                })
            }
        }
    }
}

/// Raw response of one model call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub usage: Option<TokenUsage>,
    pub output: Vec<OutputItem>,
}

/// Result object of one agent run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub new_items: Vec<RunItem>,
    pub raw_responses: Vec<ModelResponse>,
    pub final_output: Option<String>,
}

impl RunResult {
    /// Tool invocations per tool name
    ///
    /// Run items and raw responses usually describe the same calls, so the two
    /// views are merged per name by taking the larger count.
    pub fn tool_counts(&self) -> BTreeMap<String, u64> {
        let mut from_items: BTreeMap<String, u64> = BTreeMap::new();
        for name in self.new_items.iter().filter_map(RunItem::tool_name) {
            *from_items.entry(name).or_default() += 1;
        }

        let mut from_raw: BTreeMap<String, u64> = BTreeMap::new();
        for name in self
            .raw_responses
            .iter()
            .flat_map(|r| r.output.iter())
            .filter_map(OutputItem::tool_name)
        {
            *from_raw.entry(name).or_default() += 1;
        }

        for (name, count) in from_raw {
            let entry = from_items.entry(name).or_default();
            *entry = (*entry).max(count);
        }
        from_items
    }

    /// Summed token usage across raw responses
    pub fn usage(&self) -> TokenUsage {
        self.raw_responses
            .iter()
            .filter_map(|r| r.usage)
            .fold(TokenUsage::default(), |acc, u| TokenUsage {
                input_tokens: acc.input_tokens + u.input_tokens,
                output_tokens: acc.output_tokens + u.output_tokens,
                cached_input_tokens: acc.cached_input_tokens + u.cached_input_tokens,
            })
    }
}

/// Underlying agent runtime able to run a tool-using agent to completion
pub trait AgentBackend: Send + Sync {
    fn run<'a>(
        &'a self,
        agent: &'a AgentSpec,
        input: Vec<InputMessage>,
        max_turns: u32,
        ctx: ToolContext,
    ) -> BoxFuture<'a, Result<RunResult>>;

    /// Model used when the runner resolves none
    fn default_model(&self) -> Option<String> {
        None
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// `name`, then `function.name`
fn name_from_value(value: &Value) -> Option<String> {
    if let Some(name) = value.get("name").and_then(Value::as_str).and_then(non_empty) {
        return Some(name);
    }
    value
        .get("function")
        .and_then(|f| f.get("name"))
        .and_then(Value::as_str)
        .and_then(non_empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_call_item_shapes() {
        let named = ToolCallItem::Named {
            name: "brave_search".into(),
            call_id: "c1".into(),
        };
        assert_eq!(named.tool_name().as_deref(), Some("brave_search"));

        let nested = ToolCallItem::Function {
            function: FunctionRef { name: "exec".into() },
            call_id: "c2".into(),
        };
        assert_eq!(nested.tool_name().as_deref(), Some("exec"));

        let raw = ToolCallItem::Raw(json!({"function": {"name": "search_google_web"}}));
        assert_eq!(raw.tool_name().as_deref(), Some("search_google_web"));

        let unknown = ToolCallItem::Raw(json!({"weird": true}));
        assert_eq!(unknown.tool_name(), None);
    }

    #[test]
    fn test_raw_output_requires_call_type() {
        let call = OutputItem::Raw(json!({"type": "web_search_call", "tool_name": "web_search"}));
        assert_eq!(call.tool_name().as_deref(), Some("web_search"));

        let message = OutputItem::Raw(json!({"type": "message", "name": "assistant"}));
        assert_eq!(message.tool_name(), None);
    }

    #[test]
    fn test_tool_counts_merge_views() {
        let result = RunResult {
            new_items: vec![
                RunItem::ToolCall(ToolCallItem::Named {
                    name: "exec".into(),
                    call_id: "1".into(),
                }),
                RunItem::ToolOutput {
                    call_id: "1".into(),
                    output: "ok".into(),
                },
                RunItem::Raw(json!(42)),
            ],
            raw_responses: vec![
                ModelResponse {
                    usage: None,
                    output: vec![OutputItem::FunctionCall {
                        name: "exec".into(),
                        call_id: "1".into(),
                    }],
                },
                ModelResponse {
                    usage: None,
                    output: vec![OutputItem::HostedToolCall {
                        kind: "web_search_call".into(),
                        tool_name: String::new(),
                    }],
                },
            ],
            final_output: None,
        };
        let counts = result.tool_counts();
        assert_eq!(counts.get("exec"), Some(&1));
        assert_eq!(counts.get("web_search_call"), Some(&1));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_usage_sums_responses() {
        let result = RunResult {
            raw_responses: vec![
                ModelResponse {
                    usage: Some(TokenUsage {
                        input_tokens: 10,
                        output_tokens: 2,
                        cached_input_tokens: 4,
                    }),
                    output: vec![],
                },
                ModelResponse {
                    usage: None,
                    output: vec![],
                },
                ModelResponse {
                    usage: Some(TokenUsage {
                        input_tokens: 5,
                        output_tokens: 1,
                        cached_input_tokens: 0,
                    }),
                    output: vec![],
                },
            ],
            ..Default::default()
        };
        assert_eq!(
            result.usage(),
            TokenUsage {
                input_tokens: 15,
                output_tokens: 3,
                cached_input_tokens: 4,
            }
        );
    }
}
