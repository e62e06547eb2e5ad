//! exec tool - run a shell command and return its combined output

use serde_json::{json, Value};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::config::ExecConfig;
use crate::context::ToolContext;
use crate::error::ToolError;
use crate::formatting::truncate_output;
use crate::tools::{BoxFuture, Tool, ToolOutput};

/// Tool for executing shell commands through `sh -c`
pub struct ExecTool {
    config: ExecConfig,
}

impl ExecTool {
    pub fn new(config: ExecConfig) -> Self {
        Self { config }
    }

    fn is_command_blocked(&self, command: &str) -> bool {
        self.config
            .blocked_commands
            .iter()
            .any(|blocked| !blocked.is_empty() && command.contains(blocked.as_str()))
    }
}

impl Default for ExecTool {
    fn default() -> Self {
        Self::new(ExecConfig::default())
    }
}

impl Tool for ExecTool {
    fn name(&self) -> &str {
        "exec"
    }

    fn description(&self) -> &str {
        "Execute a shell command locally and return combined output."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    fn execute(&self, params: Value, _ctx: ToolContext) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let command = params["command"]
                .as_str()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .ok_or_else(|| ToolError::InvalidParams("command is required".into()))?;

            if self.is_command_blocked(command) {
                return Err(ToolError::PermissionDenied(format!(
                    "Command contains blocked pattern: {}",
                    command
                )));
            }

            let timeout = self.config.timeout_seconds.max(1);
            debug!(command, timeout, "Executing shell command");

            let output = tokio::time::timeout(
                Duration::from_secs(timeout),
                Command::new("sh")
                    .arg("-c")
                    .arg(command)
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .kill_on_drop(true)
                    .output(),
            )
            .await
            .map_err(|_| ToolError::ExecutionFailed(format!("Command timed out after {}s", timeout)))?
            .map_err(ToolError::Io)?;

            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            let combined = combined.trim();
            let text = if combined.is_empty() {
                "(no output)".to_string()
            } else {
                truncate_output(combined, self.config.max_output_chars)
            };

            Ok(ToolOutput::success(text).with_metadata("exit_code", output.status.code()))
        })
    }
}
