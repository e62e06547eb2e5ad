//! Session-scoped task board store
//!
//! All session, run and listener state lives behind one mutex. Mutations go
//! through [`TaskBoardStore::apply`], and every successful mutation pushes the
//! freshly rendered board to the listeners registered for that session.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::types::{
    parse_task_lines, ApplyRequest, BoardAction, Run, Session, TaskStatus, DEFAULT_TITLE,
};

/// Callback receiving the rendered board after each mutation
pub type BoardListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Handle returned by [`TaskBoardStore::register_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

const UNSUPPORTED_ACTION: &str = "ERROR: unsupported action. Use one of: init, list, add, update, \
     complete, delete, clear, replace";

const NOT_INITIALIZED: &str =
    "ERROR: Task list not initialized for this run. First call must be action=init.";

#[derive(Default)]
struct BoardState {
    sessions: HashMap<String, Session>,
    listeners: HashMap<String, Vec<(ListenerId, BoardListener)>>,
    next_listener: u64,
}

/// Outcome of an action evaluated under the lock
struct Applied {
    result: String,
    mutated: bool,
}

impl Applied {
    fn mutated(result: String) -> Self {
        Self { result, mutated: true }
    }

    fn unchanged(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            mutated: false,
        }
    }
}

/// Thread-safe store of task-board sessions
#[derive(Default)]
pub struct TaskBoardStore {
    state: Mutex<BoardState>,
}

impl TaskBoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session, replacing any existing session with the same id
    pub fn create_session(&self, session_id: &str, title: &str) -> Session {
        let mut state = self.state.lock();
        let session = Session::new(session_id, title);
        state
            .sessions
            .insert(session_id.to_string(), session.clone());
        state.listeners.entry(session_id.to_string()).or_default();
        session
    }

    pub fn get_session(&self, session_id: &str) -> Option<Session> {
        self.state.lock().sessions.get(session_id).cloned()
    }

    /// Ids of all live sessions
    pub fn session_ids(&self) -> Vec<String> {
        self.state.lock().sessions.keys().cloned().collect()
    }

    /// Get or create the run, creating the session too when needed
    pub fn ensure_run(&self, session_id: &str, run_label: &str) -> Run {
        let mut state = self.state.lock();
        ensure_run_locked(&mut state, session_id, run_label).clone()
    }

    pub fn register_listener(&self, session_id: &str, callback: BoardListener) -> ListenerId {
        let mut state = self.state.lock();
        state.next_listener += 1;
        let id = ListenerId(state.next_listener);
        state
            .listeners
            .entry(session_id.to_string())
            .or_default()
            .push((id, callback));
        id
    }

    /// Remove a listener; returns false if it was not registered
    pub fn unregister_listener(&self, session_id: &str, id: ListenerId) -> bool {
        let mut state = self.state.lock();
        match state.listeners.get_mut(session_id) {
            Some(callbacks) => {
                let before = callbacks.len();
                callbacks.retain(|(lid, _)| *lid != id);
                callbacks.len() != before
            }
            None => false,
        }
    }

    /// Drop a session and its listeners
    pub fn close_session(&self, session_id: &str) -> bool {
        let mut state = self.state.lock();
        state.listeners.remove(session_id);
        state.sessions.remove(session_id).is_some()
    }

    /// Remove sessions not touched within `max_idle`; returns how many were removed
    pub fn reap_idle(&self, max_idle: chrono::Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let mut state = self.state.lock();
        let stale: Vec<String> = state
            .sessions
            .values()
            .filter(|s| s.updated_at < cutoff)
            .map(|s| s.session_id.clone())
            .collect();
        for id in &stale {
            state.sessions.remove(id);
            state.listeners.remove(id);
        }
        if !stale.is_empty() {
            debug!(count = stale.len(), "Reaped idle task-board sessions");
        }
        stale.len()
    }

    /// Apply one board action and return the result text
    pub fn apply(&self, session_id: &str, run_label: &str, request: &ApplyRequest) -> String {
        let action_name = request.action.trim().to_lowercase();
        if action_name.is_empty() {
            return "ERROR: action is required".to_string();
        }

        let (applied, notification) = {
            let mut state = self.state.lock();
            ensure_run_locked(&mut state, session_id, run_label);

            let applied = match action_name.parse::<BoardAction>() {
                Ok(action) => apply_locked(&mut state, session_id, run_label, action, request),
                Err(_) => Applied::unchanged(UNSUPPORTED_ACTION),
            };

            let notification = if applied.mutated {
                if let Some(session) = state.sessions.get_mut(session_id) {
                    session.touch();
                }
                let text = render_locked(&state, session_id);
                let listeners: Vec<BoardListener> = state
                    .listeners
                    .get(session_id)
                    .map(|cbs| cbs.iter().map(|(_, cb)| cb.clone()).collect())
                    .unwrap_or_default();
                Some((text, listeners))
            } else {
                None
            };
            (applied, notification)
        };

        if let Some((text, listeners)) = notification {
            debug!(session_id, run_label, action = %action_name, "Task board updated");
            notify(session_id, &text, &listeners);
        }
        applied.result
    }

    /// Render the whole session as human-readable text
    pub fn render(&self, session_id: &str) -> String {
        let state = self.state.lock();
        render_locked(&state, session_id)
    }
}

fn ensure_run_locked<'a>(state: &'a mut BoardState, session_id: &str, run_label: &str) -> &'a mut Run {
    state
        .sessions
        .entry(session_id.to_string())
        .or_insert_with(|| Session::new(session_id, DEFAULT_TITLE))
        .run_mut_or_insert(run_label)
}

fn apply_locked(
    state: &mut BoardState,
    session_id: &str,
    run_label: &str,
    action: BoardAction,
    request: &ApplyRequest,
) -> Applied {
    if action == BoardAction::List {
        return Applied::unchanged(render_locked(state, session_id));
    }

    let run = ensure_run_locked(state, session_id, run_label);

    if action == BoardAction::Init {
        let items = parse_task_lines(&request.tasks_text);
        run.reset_with(&items);
        return Applied::mutated(format!(
            "SUCCESS: initialized {} tasks for {}",
            run.tasks.len(),
            run_label
        ));
    }

    if !run.initialized {
        return Applied::unchanged(NOT_INITIALIZED);
    }

    match action {
        BoardAction::Add => {
            let text = request.text.trim();
            if text.is_empty() {
                return Applied::unchanged("ERROR: text is required for action=add");
            }
            let status = if request.status.trim().is_empty() {
                TaskStatus::Todo
            } else {
                TaskStatus::parse(&request.status)
            };
            let id = run.push(text.to_string(), status);
            Applied::mutated(format!("SUCCESS: added task {}", id))
        }
        BoardAction::Update | BoardAction::Complete | BoardAction::Delete => {
            let Some(task_id) = request.task_id else {
                return Applied::unchanged(format!(
                    "ERROR: task_id is required for action={}",
                    action
                ));
            };
            if run.task(task_id).is_none() {
                return Applied::unchanged(format!("ERROR: task_id {} not found", task_id));
            }
            match action {
                BoardAction::Delete => {
                    run.tasks.retain(|t| t.id != task_id);
                    Applied::mutated(format!("SUCCESS: deleted task {}", task_id))
                }
                BoardAction::Complete => {
                    if let Some(task) = run.task_mut(task_id) {
                        task.status = TaskStatus::Done;
                        let notes = request.notes.trim();
                        if !notes.is_empty() {
                            task.notes = notes.to_string();
                        }
                    }
                    Applied::mutated(format!("SUCCESS: completed task {}", task_id))
                }
                _ => {
                    if let Some(task) = run.task_mut(task_id) {
                        let text = request.text.trim();
                        if !text.is_empty() {
                            task.text = text.to_string();
                        }
                        let status = request.status.trim();
                        if !status.is_empty() {
                            task.status = TaskStatus::parse(&status.to_lowercase());
                        }
                        let notes = request.notes.trim();
                        if !notes.is_empty() {
                            task.notes = notes.to_string();
                        }
                    }
                    Applied::mutated(format!("SUCCESS: updated task {}", task_id))
                }
            }
        }
        BoardAction::Clear => {
            run.reset_with(&[]);
            Applied::mutated(format!("SUCCESS: cleared tasks for {}", run_label))
        }
        BoardAction::Replace => {
            let items = parse_task_lines(&request.tasks_text);
            run.reset_with(&items);
            Applied::mutated(format!(
                "SUCCESS: replaced tasks for {} with {} items",
                run_label,
                run.tasks.len()
            ))
        }
        // handled above
        BoardAction::Init | BoardAction::List => Applied::unchanged(UNSUPPORTED_ACTION),
    }
}

fn render_locked(state: &BoardState, session_id: &str) -> String {
    let Some(session) = state.sessions.get(session_id) else {
        return "Task list session not found.".to_string();
    };

    let mut lines = vec![format!("🗂 {}", session.title)];
    if session.runs.is_empty() {
        lines.push("- (no runs yet)".to_string());
        return lines.join("\n");
    }

    for run in &session.runs {
        lines.push(String::new());
        lines.push(format!("{}:", run.label));
        if run.tasks.is_empty() {
            let placeholder = if run.initialized {
                "no tasks"
            } else {
                "not initialized"
            };
            lines.push(format!("- ({})", placeholder));
            continue;
        }
        for task in &run.tasks {
            lines.push(format!(
                "- [{}] {}. {}",
                task.status.marker(),
                task.id,
                task.text
            ));
            if !task.notes.is_empty() {
                lines.push(format!("  note: {}", task.notes));
            }
        }
    }
    lines.join("\n")
}

fn notify(session_id: &str, text: &str, listeners: &[BoardListener]) {
    for listener in listeners {
        if catch_unwind(AssertUnwindSafe(|| listener(text))).is_err() {
            warn!(session_id, "Task board listener panicked; ignoring");
        }
    }
}
