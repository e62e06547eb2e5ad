//! Nested tool-using agents
//!
//! [`SubAgentRunner`] runs a sub-agent to completion on behalf of a tool call
//! and reports its nested tool usage and token counts to the [`UsageLedger`].
//! The agent runtime itself sits behind the [`AgentBackend`] trait.
//!
//! [`UsageLedger`]: crate::usage::UsageLedger

mod runner;
mod types;

pub use runner::{SubAgentRunner, RETRY_INSTRUCTION};
pub use types::{
    AgentBackend, AgentSpec, FunctionRef, InputMessage, ModelResponse, OutputItem, RunItem,
    RunResult, TokenUsage, ToolCallItem,
};
