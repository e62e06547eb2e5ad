//! Synchronous execution of nested tool-using agents
//!
//! A sub-agent run is blocking from the caller's point of view, but callers
//! are frequently tools executing inside the parent agent's tokio runtime.
//! Blocking on a future from a runtime thread panics, so when a runtime is
//! active the run is moved to a dedicated worker thread with its own
//! current-thread runtime and the caller joins it.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::context::ToolContext;
use crate::error::{Error, Result};
use crate::tools::Tool;
use crate::usage::UsageLedger;

use super::types::{AgentBackend, AgentSpec, InputMessage, RunResult, TokenUsage};

/// Appended to the prompt when the first attempt used no tools
pub const RETRY_INSTRUCTION: &str = "MANDATORY: Use your available tools to gather evidence \
     before answering. Do not answer from memory only.";

const MAX_ATTEMPTS: usize = 2;
const DEFAULT_MAX_TURNS: u32 = 30;
const MIN_MAX_TURNS: u32 = 2;

/// Ledger key used when no model name is resolved
const DEFAULT_MODEL_KEY: &str = "default";

/// Runs nested agents with a one-shot "use your tools" retry
pub struct SubAgentRunner {
    backend: Option<Arc<dyn AgentBackend>>,
    usage: Arc<UsageLedger>,
    model_name: Option<String>,
    model_env: Option<String>,
    max_turns: u32,
}

impl SubAgentRunner {
    /// `backend` is `None` when no agent runtime is available in-process
    pub fn new(backend: Option<Arc<dyn AgentBackend>>, usage: Arc<UsageLedger>) -> Self {
        Self {
            backend,
            usage,
            model_name: None,
            model_env: None,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model_name = if model.trim().is_empty() {
            None
        } else {
            Some(model.trim().to_string())
        };
        self
    }

    /// Environment variable consulted when no explicit model is set
    pub fn with_model_env(mut self, var: impl Into<String>) -> Self {
        self.model_env = Some(var.into());
        self
    }

    /// Turn cap per attempt; zero means the default, never below two
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        let turns = if max_turns == 0 {
            DEFAULT_MAX_TURNS
        } else {
            max_turns
        };
        self.max_turns = turns.max(MIN_MAX_TURNS);
        self
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    /// Explicit model, then the environment variable, then the backend default
    pub fn resolved_model(&self) -> Option<String> {
        if let Some(model) = &self.model_name {
            return Some(model.clone());
        }
        if let Some(var) = &self.model_env {
            if let Ok(value) = std::env::var(var) {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
        self.backend.as_ref().and_then(|b| b.default_model())
    }

    /// Run a nested agent and block until it finishes
    ///
    /// Safe to call from inside or outside a tokio runtime.
    pub fn run(
        &self,
        prompt: &str,
        agent_name: &str,
        system_prompt: &str,
        tools: Vec<Arc<dyn Tool>>,
        ctx: ToolContext,
    ) -> Result<String> {
        if tokio::runtime::Handle::try_current().is_ok() {
            debug!(agent = agent_name, "Runtime active on caller thread; running sub-agent on worker thread");
            std::thread::scope(|scope| {
                let worker = scope.spawn(|| {
                    block_on_fresh_runtime(self.run_async(prompt, agent_name, system_prompt, tools, ctx))
                });
                match worker.join() {
                    Ok(result) => result,
                    Err(payload) => Err(Error::Agent(format!(
                        "sub-agent worker panicked: {}",
                        panic_message(payload.as_ref())
                    ))),
                }
            })
        } else {
            block_on_fresh_runtime(self.run_async(prompt, agent_name, system_prompt, tools, ctx))
        }
    }

    /// Boundary wrapper around [`run`](Self::run) that never fails
    pub fn run_tool(
        &self,
        prompt: &str,
        agent_name: &str,
        system_prompt: &str,
        tools: Vec<Arc<dyn Tool>>,
        ctx: ToolContext,
    ) -> String {
        match self.run(prompt, agent_name, system_prompt, tools, ctx) {
            Ok(text) => text,
            Err(e) => format!("ERROR: {}", e),
        }
    }

    /// Async form of the same attempt loop, for callers already on a runtime
    pub async fn run_async(
        &self,
        prompt: &str,
        agent_name: &str,
        system_prompt: &str,
        tools: Vec<Arc<dyn Tool>>,
        ctx: ToolContext,
    ) -> Result<String> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::InvalidInput("prompt cannot be empty".to_string()));
        }
        let backend = self.backend.as_ref().ok_or(Error::RuntimeUnavailable)?;

        let model = self.resolved_model();
        let agent = AgentSpec {
            name: agent_name.to_string(),
            instructions: system_prompt.to_string(),
            tools,
            model: model.clone(),
        };

        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        let mut usage = TokenUsage::default();
        let mut last: Option<RunResult> = None;
        let mut failure: Option<Error> = None;

        for attempt in 0..MAX_ATTEMPTS {
            let input = if attempt == 0 {
                prompt.to_string()
            } else {
                format!("{}\n\n{}", prompt, RETRY_INSTRUCTION)
            };
            info!(agent = agent_name, attempt = attempt + 1, model = ?model, "Running sub-agent");

            let result = match backend
                .run(&agent, vec![InputMessage::user(input)], self.max_turns, ctx.clone())
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };

            let attempt_counts = result.tool_counts();
            let used: u64 = attempt_counts.values().sum();
            for (name, count) in attempt_counts {
                *counts.entry(name).or_default() += count;
            }
            let attempt_usage = result.usage();
            usage.input_tokens += attempt_usage.input_tokens;
            usage.output_tokens += attempt_usage.output_tokens;
            usage.cached_input_tokens += attempt_usage.cached_input_tokens;
            last = Some(result);

            if used > 0 {
                break;
            }
            if attempt + 1 < MAX_ATTEMPTS {
                warn!(agent = agent_name, "Sub-agent answered without tools; retrying with mandatory tool use");
            }
        }

        self.report(&counts, usage, model.as_deref());

        if let Some(e) = failure {
            return Err(e);
        }
        let result = last.ok_or(Error::NoResult)?;
        let output = result.final_output.as_deref().unwrap_or("").trim();
        if output.is_empty() {
            return Err(Error::EmptyResponse);
        }
        Ok(output.to_string())
    }

    fn report(&self, counts: &BTreeMap<String, u64>, usage: TokenUsage, model: Option<&str>) {
        for (name, count) in counts {
            self.usage.add(name, *count);
        }
        self.usage.add_tokens(
            model.unwrap_or(DEFAULT_MODEL_KEY),
            usage.input_tokens,
            usage.output_tokens,
            usage.cached_input_tokens,
        );
    }
}

fn block_on_fresh_runtime<F>(future: F) -> Result<String>
where
    F: std::future::Future<Output = Result<String>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(future)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_turns_floor() {
        let usage = Arc::new(UsageLedger::new());
        let runner = SubAgentRunner::new(None, usage.clone()).with_max_turns(1);
        assert_eq!(runner.max_turns(), 2);
        let runner = SubAgentRunner::new(None, usage.clone()).with_max_turns(0);
        assert_eq!(runner.max_turns(), 30);
        let runner = SubAgentRunner::new(None, usage).with_max_turns(12);
        assert_eq!(runner.max_turns(), 12);
    }

    #[test]
    fn test_resolved_model_priority() {
        let usage = Arc::new(UsageLedger::new());
        let var = "SCOUT_TEST_RUNNER_MODEL_PRIORITY";
        // SAFETY: test-only variable not read by other tests
        unsafe { std::env::set_var(var, " env-model ") };

        let runner = SubAgentRunner::new(None, usage.clone())
            .with_model("explicit-model")
            .with_model_env(var);
        assert_eq!(runner.resolved_model().as_deref(), Some("explicit-model"));

        let runner = SubAgentRunner::new(None, usage.clone())
            .with_model("  ")
            .with_model_env(var);
        assert_eq!(runner.resolved_model().as_deref(), Some("env-model"));

        unsafe { std::env::remove_var(var) };
        let runner = SubAgentRunner::new(None, usage).with_model_env(var);
        assert_eq!(runner.resolved_model(), None);
    }

    #[test]
    fn test_empty_prompt_rejected() {
        let runner = SubAgentRunner::new(None, Arc::new(UsageLedger::new()));
        let text = runner.run_tool("   ", "agent", "", vec![], ToolContext::standalone());
        assert_eq!(text, "ERROR: prompt cannot be empty");
    }

    #[test]
    fn test_missing_runtime() {
        let runner = SubAgentRunner::new(None, Arc::new(UsageLedger::new()));
        let text = runner.run_tool("find papers", "agent", "", vec![], ToolContext::standalone());
        assert_eq!(text, "ERROR: agent runtime is not available");
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
