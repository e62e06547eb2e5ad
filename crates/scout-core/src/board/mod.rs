//! Live per-request task board
//!
//! The board is shared by the main agent loop and any nested sub-agents it
//! spawns. Callers mutate it through a small action protocol and observers
//! (e.g. a chat UI) receive the rendered board after every change.

mod store;
mod types;

pub use store::{BoardListener, ListenerId, TaskBoardStore};
pub use types::{ApplyRequest, BoardAction, Run, Session, Task, TaskStatus, DEFAULT_TITLE};
