//! Shell tool for local command execution

mod exec;

pub use exec::ExecTool;
