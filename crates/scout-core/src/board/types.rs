//! Task board data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a task on the board
///
/// The three known values parse case-insensitively. Anything else is kept
/// verbatim and renders with the open marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    Doing,
    Done,
    Other(String),
}

impl TaskStatus {
    /// Parse caller-supplied status text
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_lowercase().as_str() {
            "todo" => TaskStatus::Todo,
            "doing" => TaskStatus::Doing,
            "done" => TaskStatus::Done,
            _ => TaskStatus::Other(trimmed.to_string()),
        }
    }

    /// Marker shown between the brackets when rendering
    pub fn marker(&self) -> char {
        match self {
            TaskStatus::Done => 'x',
            TaskStatus::Doing => '~',
            _ => ' ',
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Doing => "doing",
            TaskStatus::Done => "done",
            TaskStatus::Other(s) => s,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single task item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub text: String,
    pub status: TaskStatus,
    pub notes: String,
}

impl Task {
    pub fn new(id: u64, text: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id,
            text: text.into(),
            status,
            notes: String::new(),
        }
    }
}

/// A labeled phase within a session with its own task list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub label: String,
    pub initialized: bool,
    pub next_id: u64,
    pub tasks: Vec<Task>,
}

impl Run {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            initialized: false,
            next_id: 1,
            tasks: Vec::new(),
        }
    }

    /// Replace the task list with fresh ids starting at 1 and mark initialized
    pub(crate) fn reset_with(&mut self, items: &[String]) {
        self.tasks.clear();
        self.next_id = 1;
        for item in items {
            self.push(item.clone(), TaskStatus::Todo);
        }
        self.initialized = true;
    }

    /// Append a task with the next id and return that id
    pub(crate) fn push(&mut self, text: String, status: TaskStatus) -> u64 {
        let id = self.next_id;
        self.tasks.push(Task::new(id, text, status));
        self.next_id += 1;
        id
    }

    pub fn task(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub(crate) fn task_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }
}

/// One request/conversation's task-board namespace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub title: String,
    /// Runs in insertion order
    pub runs: Vec<Run>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const DEFAULT_TITLE: &str = "Task List";

impl Session {
    pub fn new(session_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            title: title.into(),
            runs: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn run(&self, label: &str) -> Option<&Run> {
        self.runs.iter().find(|r| r.label == label)
    }

    pub(crate) fn run_mut_or_insert(&mut self, label: &str) -> &mut Run {
        let idx = match self.runs.iter().position(|r| r.label == label) {
            Some(idx) => idx,
            None => {
                self.runs.push(Run::new(label));
                self.runs.len() - 1
            }
        };
        &mut self.runs[idx]
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Actions accepted by the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardAction {
    Init,
    List,
    Add,
    Update,
    Complete,
    Delete,
    Clear,
    Replace,
}

impl BoardAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardAction::Init => "init",
            BoardAction::List => "list",
            BoardAction::Add => "add",
            BoardAction::Update => "update",
            BoardAction::Complete => "complete",
            BoardAction::Delete => "delete",
            BoardAction::Clear => "clear",
            BoardAction::Replace => "replace",
        }
    }
}

impl std::str::FromStr for BoardAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "init" => Ok(BoardAction::Init),
            "list" => Ok(BoardAction::List),
            "add" => Ok(BoardAction::Add),
            "update" => Ok(BoardAction::Update),
            "complete" => Ok(BoardAction::Complete),
            "delete" => Ok(BoardAction::Delete),
            "clear" => Ok(BoardAction::Clear),
            "replace" => Ok(BoardAction::Replace),
            other => Err(format!("Unknown action: {}", other)),
        }
    }
}

impl std::fmt::Display for BoardAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments for a single `apply` call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyRequest {
    pub action: String,
    #[serde(default)]
    pub task_id: Option<u64>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tasks_text: String,
    #[serde(default)]
    pub notes: String,
}

impl ApplyRequest {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn with_task_id(mut self, id: u64) -> Self {
        self.task_id = Some(id);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_tasks(mut self, tasks_text: impl Into<String>) -> Self {
        self.tasks_text = tasks_text.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// Split newline-separated task text, dropping blank lines
pub(crate) fn parse_task_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
