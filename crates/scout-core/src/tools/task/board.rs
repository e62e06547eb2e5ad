//! task_list tool - lets an agent maintain its own live plan
//!
//! The tool is a thin binding of [`TaskBoardStore::apply`]. The session and
//! run it targets come from the [`ToolContext`] of the call, so nested
//! sub-agents write to the same board as the agent that spawned them.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::board::{ApplyRequest, TaskBoardStore};
use crate::context::ToolContext;
use crate::error::ToolError;
use crate::tools::{param_str, param_u64, BoxFuture, Tool, ToolOutput};

const DESCRIPTION: &str = "Maintain a short task list for the current request. \
First call must be action=init with newline-separated tasks. \
Then use add, update, complete (optionally with notes), delete, clear, replace or list. \
Mark tasks done as soon as they are finished.";

/// Tool binding the shared task board
pub struct TaskListTool {
    store: Arc<TaskBoardStore>,
}

impl TaskListTool {
    pub fn new(store: Arc<TaskBoardStore>) -> Self {
        Self { store }
    }

    fn request_from(params: &Value) -> ApplyRequest {
        let mut request = ApplyRequest::new(param_str(params, "action"))
            .with_text(param_str(params, "text"))
            .with_status(param_str(params, "status"))
            .with_tasks(param_str(params, "tasks"))
            .with_notes(param_str(params, "notes"));
        if let Some(id) = param_u64(params, "task_id") {
            request = request.with_task_id(id);
        }
        request
    }
}

impl Tool for TaskListTool {
    fn name(&self) -> &str {
        "task_list"
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["init", "list", "add", "update", "complete", "delete", "clear", "replace"],
                    "description": "Board action to perform"
                },
                "task_id": {
                    "type": "integer",
                    "description": "Task id for update, complete and delete"
                },
                "text": {
                    "type": "string",
                    "description": "Task text for add and update"
                },
                "status": {
                    "type": "string",
                    "description": "todo, doing or done"
                },
                "tasks": {
                    "type": "string",
                    "description": "Newline-separated tasks for init and replace"
                },
                "notes": {
                    "type": "string",
                    "description": "Short note attached on update or complete"
                }
            },
            "required": ["action"]
        })
    }

    fn execute(&self, params: Value, ctx: ToolContext) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let session_id = ctx
                .session_id()
                .ok_or_else(|| ToolError::ExecutionFailed("no active task-list session".into()))?;
            let request = Self::request_from(&params);
            let result = self.store.apply(session_id, ctx.run_label(), &request);
            Ok(ToolOutput {
                success: !result.starts_with("ERROR:"),
                ..ToolOutput::success(result)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::invoke;

    #[tokio::test]
    async fn test_requires_session() {
        let tool = TaskListTool::new(Arc::new(TaskBoardStore::new()));
        let text = invoke(&tool, json!({"action": "list"}), ToolContext::standalone()).await;
        assert_eq!(text, "ERROR: no active task-list session");
    }

    #[tokio::test]
    async fn test_targets_context_run() {
        let store = Arc::new(TaskBoardStore::new());
        let tool = TaskListTool::new(store.clone());
        let ctx = ToolContext::new("s1", "Run 2 (self-critique)");

        let text = invoke(&tool, json!({"action": "init", "tasks": "Search\nSummarize"}), ctx.clone()).await;
        assert_eq!(text, "SUCCESS: initialized 2 tasks for Run 2 (self-critique)");

        let text = invoke(&tool, json!({"action": "complete", "task_id": "1"}), ctx).await;
        assert_eq!(text, "SUCCESS: completed task 1");

        let rendered = store.render("s1");
        assert!(rendered.contains("Run 2 (self-critique):"));
        assert!(rendered.contains("- [x] 1. Search"));
        assert!(rendered.contains("- [ ] 2. Summarize"));
    }

    #[tokio::test]
    async fn test_board_errors_pass_through() {
        let tool = TaskListTool::new(Arc::new(TaskBoardStore::new()));
        let ctx = ToolContext::new("s1", "Run 1");
        let text = invoke(&tool, json!({"action": "add", "text": "x"}), ctx).await;
        assert!(text.starts_with("ERROR: Task list not initialized"));
    }
}
