//! Request-scoped tool execution context
//!
//! Carries the active task-board session and run label down the call chain.
//! The context is passed explicitly to every tool call and is forwarded by
//! the sub-agent runner to nested tool calls, so concurrent requests never
//! share ambient state.

use serde::{Deserialize, Serialize};

pub const DEFAULT_RUN_LABEL: &str = "Run 1";

/// Context handed to every tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolContext {
    /// Task-board session targeted by this call chain
    pub session_id: Option<String>,
    /// Run label within the session (e.g. "Run 2 (self-critique)")
    pub run_label: String,
    /// Tool call ID (for this execution)
    pub tool_call_id: String,
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::standalone()
    }
}

impl ToolContext {
    pub fn new(session_id: impl Into<String>, run_label: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            run_label: run_label.into(),
            tool_call_id: String::new(),
        }
    }

    /// Context with no task-board session, for tools run outside a request
    pub fn standalone() -> Self {
        Self {
            session_id: None,
            run_label: DEFAULT_RUN_LABEL.to_string(),
            tool_call_id: String::new(),
        }
    }

    pub fn with_run_label(mut self, run_label: impl Into<String>) -> Self {
        self.run_label = run_label.into();
        self
    }

    pub fn with_tool_call_id(mut self, tool_call_id: impl Into<String>) -> Self {
        self.tool_call_id = tool_call_id.into();
        self
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn run_label(&self) -> &str {
        &self.run_label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standalone_defaults() {
        let ctx = ToolContext::standalone();
        assert!(ctx.session_id().is_none());
        assert_eq!(ctx.run_label(), "Run 1");
    }

    #[test]
    fn test_child_context_keeps_session() {
        let parent = ToolContext::new("req-42", "Run 2 (self-critique)");
        let child = parent.clone().with_tool_call_id("call_1");
        assert_eq!(child.session_id(), Some("req-42"));
        assert_eq!(child.run_label(), "Run 2 (self-critique)");
        assert_eq!(parent.tool_call_id, "");
    }
}
