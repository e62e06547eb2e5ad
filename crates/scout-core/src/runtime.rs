//! genai-backed agent runtime
//!
//! Runs a tool-using agent to completion: stream a chat completion, execute
//! the tool calls it requests, feed the results back, and repeat until the
//! model answers without tools.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest, ChatStreamEvent, ToolCall, ToolResponse};
use genai::{Client, WebConfig};
use tracing::{debug, error};

use crate::context::ToolContext;
use crate::error::{Error, Result};
use crate::subagent::{
    AgentBackend, AgentSpec, InputMessage, ModelResponse, OutputItem, RunItem, RunResult,
    TokenUsage, ToolCallItem,
};
use crate::tools::{self, BoxFuture, Tool};

/// Default timeout for LLM API requests (5 minutes)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// One streamed model turn
struct Completion {
    content: String,
    tool_calls: Vec<ToolCall>,
    usage: Option<TokenUsage>,
}

/// [`AgentBackend`] over the genai multi-provider client
pub struct GenAiBackend {
    client: Client,
    default_model: Option<String>,
}

impl GenAiBackend {
    /// Provider credentials come from the usual environment variables
    pub fn new(default_model: Option<String>) -> Self {
        let client = Client::builder()
            .with_web_config(
                WebConfig::default()
                    .with_timeout(DEFAULT_TIMEOUT)
                    .with_connect_timeout(Duration::from_secs(30)),
            )
            .build();
        Self {
            client,
            default_model: default_model.filter(|m| !m.trim().is_empty()),
        }
    }

    fn initial_request(agent: &AgentSpec, input: &[InputMessage]) -> ChatRequest {
        let mut req = ChatRequest::default();
        if !agent.instructions.trim().is_empty() {
            req = req.with_system(agent.instructions.as_str());
        }
        for message in input {
            req = match message.role.as_str() {
                "assistant" => req.append_message(ChatMessage::assistant(&message.content)),
                "system" => req.append_message(ChatMessage::system(&message.content)),
                _ => req.append_message(ChatMessage::user(&message.content)),
            };
        }
        if !agent.tools.is_empty() {
            let defs: Vec<genai::chat::Tool> = agent
                .tools
                .iter()
                .map(|t| {
                    genai::chat::Tool::new(t.name())
                        .with_description(t.description())
                        .with_schema(t.parameters_schema())
                })
                .collect();
            req = req.with_tools(defs);
        }
        req
    }

    async fn complete(&self, model: &str, req: ChatRequest) -> Result<Completion> {
        let options = ChatOptions::default().with_capture_usage(true);
        let response = self
            .client
            .exec_chat_stream(model, req, Some(&options))
            .await
            .map_err(|e| Error::Provider(format!("GenAI error: {:?}", e)))?;

        let mut completion = Completion {
            content: String::new(),
            tool_calls: Vec::new(),
            usage: None,
        };
        let mut stream = response.stream;
        while let Some(event) = stream.next().await {
            match event {
                Ok(ChatStreamEvent::Chunk(chunk)) => completion.content.push_str(&chunk.content),
                Ok(ChatStreamEvent::ToolCallChunk(tc)) => completion.tool_calls.push(tc.tool_call),
                Ok(ChatStreamEvent::End(end)) => {
                    completion.usage = end.captured_usage.map(|u| TokenUsage {
                        input_tokens: non_negative(u.prompt_tokens),
                        output_tokens: non_negative(u.completion_tokens),
                        cached_input_tokens: non_negative(
                            u.prompt_tokens_details.and_then(|d| d.cached_tokens),
                        ),
                    });
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = ?e, model, "LLM stream error");
                    return Err(Error::Provider(format!("GenAI stream error: {:?}", e)));
                }
            }
        }
        Ok(completion)
    }
}

fn non_negative(value: Option<i32>) -> u64 {
    value.map(|v| v.max(0) as u64).unwrap_or(0)
}

impl AgentBackend for GenAiBackend {
    fn run<'a>(
        &'a self,
        agent: &'a AgentSpec,
        input: Vec<InputMessage>,
        max_turns: u32,
        ctx: ToolContext,
    ) -> BoxFuture<'a, Result<RunResult>> {
        Box::pin(async move {
            let model = agent
                .model
                .clone()
                .or_else(|| self.default_model.clone())
                .ok_or_else(|| Error::Config("no model configured for sub-agent".to_string()))?;

            let tools_by_name: HashMap<&str, Arc<dyn Tool>> =
                agent.tools.iter().map(|t| (t.name(), t.clone())).collect();
            let mut req = Self::initial_request(agent, &input);
            let mut result = RunResult::default();

            for turn in 0..max_turns {
                debug!(agent = %agent.name, turn = turn + 1, model = %model, "Sub-agent model call");
                let completion = self.complete(&model, req.clone()).await?;

                let mut output: Vec<OutputItem> = completion
                    .tool_calls
                    .iter()
                    .map(|c| OutputItem::FunctionCall {
                        name: c.fn_name.clone(),
                        call_id: c.call_id.clone(),
                    })
                    .collect();
                if !completion.content.is_empty() {
                    output.push(OutputItem::Message(completion.content.clone()));
                }
                result.raw_responses.push(ModelResponse {
                    usage: completion.usage,
                    output,
                });

                if completion.tool_calls.is_empty() {
                    result.new_items.push(RunItem::Message(completion.content.clone()));
                    result.final_output = Some(completion.content);
                    return Ok(result);
                }

                req = req.append_message(completion.tool_calls.clone());
                for call in completion.tool_calls {
                    result.new_items.push(RunItem::ToolCall(ToolCallItem::Named {
                        name: call.fn_name.clone(),
                        call_id: call.call_id.clone(),
                    }));
                    let call_ctx = ctx.clone().with_tool_call_id(call.call_id.clone());
                    let text = match tools_by_name.get(call.fn_name.as_str()) {
                        Some(tool) => {
                            tools::invoke(tool.as_ref(), call.fn_arguments.clone(), call_ctx).await
                        }
                        None => format!("ERROR: Tool not found: {}", call.fn_name),
                    };
                    result.new_items.push(RunItem::ToolOutput {
                        call_id: call.call_id.clone(),
                        output: text.clone(),
                    });
                    req = req.append_message(ToolResponse::new(call.call_id, text));
                }
            }

            Err(Error::MaxTurns(max_turns))
        })
    }

    fn default_model(&self) -> Option<String> {
        self.default_model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_default_model_is_none() {
        assert_eq!(GenAiBackend::new(Some("  ".into())).default_model(), None);
        assert_eq!(
            GenAiBackend::new(Some("gpt-4o-mini".into())).default_model().as_deref(),
            Some("gpt-4o-mini")
        );
    }

    #[tokio::test]
    async fn test_missing_model_is_config_error() {
        let backend = GenAiBackend::new(None);
        let agent = AgentSpec {
            name: "probe".into(),
            instructions: String::new(),
            tools: vec![],
            model: None,
        };
        let err = backend
            .run(&agent, vec![InputMessage::user("hi")], 2, ToolContext::standalone())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
