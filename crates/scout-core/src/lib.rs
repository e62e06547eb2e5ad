//! Scout Core - research tools and a live task board for LLM agents
//!
//! This crate provides:
//! - A session-scoped task board the agent and its sub-agents share
//! - The tool system and the research tools (web, PDF, shell)
//! - Synchronous execution of nested research sub-agents
//! - Usage accounting of nested tool calls and tokens

pub mod board;
pub mod config;
pub mod context;
pub mod error;
pub mod formatting;
pub mod runtime;
pub mod subagent;
pub mod tools;
pub mod toolset;
pub mod usage;

pub use board::{ApplyRequest, ListenerId, TaskBoardStore};
pub use config::{ConfigManager, ToolsConfig};
pub use context::ToolContext;
pub use error::{Error, Result, ToolError};
pub use runtime::GenAiBackend;
pub use subagent::{AgentBackend, SubAgentRunner};
pub use tools::{Tool, ToolDefinition, ToolOutput, ToolRegistry};
pub use toolset::{ToolProfile, ToolsetBuilder};
pub use usage::UsageLedger;
