//! Task board tool

mod board;

pub use board::TaskListTool;
