// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task isolated context snapshots.
//!
//! Each dispatched task receives a read-only snapshot assembled from its
//! node definition, the results of its dependencies, and a bounded slice
//! of recent history. The snapshot is truncated to the configured token
//! budget; the isolation level is advisory for downstream consumers.

use vibe_core::{
    estimate_tokens, ContextId, ExecutionResult, IdGen, IsolationLevel, Message, TaskContext,
    TaskNode,
};

/// Priority at or above which a task gets strict isolation.
const STRICT_PRIORITY: i64 = 10;

/// Fan-in above which a task gets loose isolation.
const LOOSE_FAN_IN: usize = 3;

/// Intrinsic token overhead of any snapshot (framing, invariants).
const BASE_OVERHEAD_TOKENS: usize = 1_000;

/// Snapshot assembly limits.
#[derive(Debug, Clone)]
pub struct IsolationConfig {
    /// Hard token budget per snapshot
    pub max_tokens: usize,
    /// Recent history messages included
    pub history_limit: usize,
    /// Include results of failed dependencies
    pub include_failed_dependencies: bool,
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 8_000,
            history_limit: 5,
            include_failed_dependencies: false,
        }
    }
}

/// Builds isolated context snapshots.
pub struct ContextIsolator<G: IdGen> {
    config: IsolationConfig,
    id_gen: G,
}

impl<G: IdGen> ContextIsolator<G> {
    pub fn new(config: IsolationConfig, id_gen: G) -> Self {
        Self { config, id_gen }
    }

    /// Assemble the snapshot for one task.
    pub fn create_context(
        &self,
        task: &TaskNode,
        dep_results: &[ExecutionResult],
        history: &[Message],
    ) -> TaskContext {
        let mut content = String::new();
        content.push_str(&format!("# Task {}\n\nCommand: {}\n", task.id, task.command));
        if let Some(cwd) = &task.cwd {
            content.push_str(&format!("Working directory: {}\n", cwd.display()));
        }
        if !task.env.is_empty() {
            content.push_str("Environment:\n");
            for (key, value) in &task.env {
                content.push_str(&format!("  {}={}\n", key, value));
            }
        }

        let included: Vec<&ExecutionResult> = dep_results
            .iter()
            .filter(|r| r.success || self.config.include_failed_dependencies)
            .collect();
        if !included.is_empty() {
            content.push_str("\n## Dependency results\n");
            for result in &included {
                content.push_str(&format!(
                    "- {} ({}): {}\n",
                    result.task_id,
                    if result.success { "ok" } else { "failed" },
                    summarize_output(result),
                ));
            }
        }

        if !history.is_empty() {
            content.push_str("\n## Recent history\n");
            let start = history.len().saturating_sub(self.config.history_limit);
            for message in &history[start..] {
                content.push_str(&format!("{}: {}\n", message.role_label(), message.content()));
            }
        }

        let base_tokens = estimate_tokens(&content) + BASE_OVERHEAD_TOKENS;

        let mut truncated = false;
        let mut summary = None;
        let char_budget = self
            .config
            .max_tokens
            .saturating_sub(BASE_OVERHEAD_TOKENS)
            .saturating_mul(vibe_core::token::CHARS_PER_TOKEN);
        if content.chars().count() > char_budget {
            content = content.chars().take(char_budget).collect();
            truncated = true;
            summary = Some(format!(
                "snapshot truncated from {} to {} tokens",
                base_tokens, self.config.max_tokens
            ));
        }

        TaskContext {
            context_id: ContextId::new(self.id_gen.mint()),
            task_id: task.id.clone(),
            base_tokens,
            max_tokens: self.config.max_tokens,
            truncated,
            dependency_ids: task.depends_on.clone(),
            summary,
            isolation_level: isolation_level(task),
            content,
        }
    }
}

/// Strict for high-priority tasks, loose for wide fan-in, else moderate.
fn isolation_level(task: &TaskNode) -> IsolationLevel {
    if task.priority.unwrap_or(0) >= STRICT_PRIORITY {
        IsolationLevel::Strict
    } else if task.depends_on.len() > LOOSE_FAN_IN {
        IsolationLevel::Loose
    } else {
        IsolationLevel::Moderate
    }
}

/// First line of whichever output stream carries signal.
fn summarize_output(result: &ExecutionResult) -> String {
    let source: &str = if result.success {
        &result.stdout
    } else {
        result.error.as_deref().unwrap_or(&result.stderr)
    };
    source.lines().next().unwrap_or("").chars().take(120).collect()
}

#[cfg(test)]
#[path = "isolation_tests.rs"]
mod tests;
