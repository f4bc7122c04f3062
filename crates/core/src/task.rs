// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task graph domain types.
//!
//! The graph engine (vibe-engine) owns the execution logic; the types
//! live here so drivers and adapters can speak them without depending on
//! the engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::string_id! {
    /// Unique identifier for a task node.
    pub struct TaskId;
}

crate::string_id! {
    /// Unique identifier for an isolated context snapshot.
    pub struct ContextId;
}

/// A node in the task graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: TaskId,
    /// Command the sub-agent runs for this task
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl TaskNode {
    pub fn new(id: impl Into<TaskId>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
            cwd: None,
            env: Vec::new(),
            depends_on: Vec::new(),
            priority: None,
            timeout_ms: None,
        }
    }

    pub fn with_deps(mut self, deps: impl IntoIterator<Item = impl Into<TaskId>>) -> Self {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// Execution status of a task node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

/// Outcome of running a single task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub task_id: TaskId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modified_files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// A failed result carrying only an error message.
    pub fn failure(task_id: TaskId, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            task_id,
            success: false,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms,
            modified_files: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// How strongly a task's context is walled off from the rest of the run.
///
/// Derived from task priority and fan-in; advisory for downstream
/// consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    Strict,
    Moderate,
    Loose,
}

/// Read-only context snapshot handed to the sub-agent running a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    pub context_id: ContextId,
    pub task_id: TaskId,
    /// Token estimate of the assembled content before truncation
    pub base_tokens: usize,
    pub max_tokens: usize,
    pub truncated: bool,
    pub dependency_ids: Vec<TaskId>,
    /// Set iff the snapshot was truncated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub isolation_level: IsolationLevel,
    /// Rendered snapshot content
    pub content: String,
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
