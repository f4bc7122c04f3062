// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrency-capped DAG execution through a task driver.
//!
//! Ready tasks are dispatched through the configured driver (normally the
//! circuit-breaker router) with an isolated context snapshot each, up to
//! `max_concurrent` in flight. Two tasks with a path between them never
//! run together; a failure blocks its dependents, which end the run
//! skipped.

use crate::graph::{GraphError, TaskGraph};
use crate::isolation::ContextIsolator;
use std::collections::HashMap;
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, Instrument};
use vibe_adapters::TaskDriver;
use vibe_core::{ExecutionResult, IdGen, TaskId, TaskStatus};

/// Errors that can occur while executing a graph
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("invalid graph: {}", .0.join("; "))]
    InvalidGraph(Vec<String>),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Executor limits.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub max_concurrent: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

/// Outcome of a full graph run.
#[derive(Debug, Default)]
pub struct ExecutionSummary {
    pub results: HashMap<TaskId, ExecutionResult>,
    pub completed: Vec<TaskId>,
    pub failed: Vec<TaskId>,
    pub skipped: Vec<TaskId>,
}

/// Drives a task graph to completion.
pub struct GraphExecutor<D: TaskDriver, G: IdGen> {
    driver: D,
    isolator: ContextIsolator<G>,
    config: ExecutorConfig,
}

impl<D: TaskDriver, G: IdGen> GraphExecutor<D, G> {
    pub fn new(driver: D, isolator: ContextIsolator<G>, config: ExecutorConfig) -> Self {
        Self {
            driver,
            isolator,
            config,
        }
    }

    /// Run every task in the graph, respecting dependencies and the
    /// concurrency cap. The graph is validated first; structural errors
    /// abort before anything runs.
    pub async fn run(&self, mut graph: TaskGraph) -> Result<ExecutionSummary, ExecutorError> {
        let report = graph.validate();
        if !report.is_valid() {
            return Err(ExecutorError::InvalidGraph(report.errors));
        }

        let mut results: HashMap<TaskId, ExecutionResult> = HashMap::new();
        let mut join_set: JoinSet<(TaskId, ExecutionResult)> = JoinSet::new();
        let mut task_ids: HashMap<tokio::task::Id, TaskId> = HashMap::new();

        loop {
            // Dispatch whatever is ready, up to the cap
            let ready: Vec<_> = graph
                .ready_tasks()
                .into_iter()
                .take(
                    self.config
                        .max_concurrent
                        .saturating_sub(join_set.len()),
                )
                .cloned()
                .collect();

            for node in ready {
                graph.set_status(&node.id, TaskStatus::Running)?;

                let dep_results: Vec<ExecutionResult> = node
                    .depends_on
                    .iter()
                    .filter_map(|dep| results.get(dep).cloned())
                    .collect();
                let context = self.isolator.create_context(&node, &dep_results, &[]);
                let driver = self.driver.clone();

                let span = info_span!("task", id = %node.id);
                let node_id = node.id.clone();
                let handle = join_set.spawn(
                    async move {
                        let started = Instant::now();
                        let task_id = node.id.clone();
                        let result = match driver.run(&node, &context).await {
                            Ok(output) => {
                                let success = output.exit_code.unwrap_or(0) == 0;
                                ExecutionResult {
                                    task_id: task_id.clone(),
                                    success,
                                    exit_code: output.exit_code,
                                    stdout: output.stdout,
                                    stderr: output.stderr,
                                    duration_ms: started.elapsed().as_millis() as u64,
                                    modified_files: output.modified_files,
                                    error: None,
                                }
                            }
                            Err(e) => ExecutionResult::failure(
                                task_id.clone(),
                                e.to_string(),
                                started.elapsed().as_millis() as u64,
                            ),
                        };
                        (task_id, result)
                    }
                    .instrument(span),
                );
                task_ids.insert(handle.id(), node_id);
            }

            if join_set.is_empty() {
                // Nothing running and nothing ready: settle the blocked rest
                let skipped = graph.skip_blocked();
                if !skipped.is_empty() {
                    info!(count = skipped.len(), "skipped tasks blocked by failures");
                }
                if graph.ready_tasks().is_empty() {
                    break;
                }
                continue;
            }

            match join_set.join_next_with_id().await {
                Some(Ok((join_id, (task_id, result)))) => {
                    task_ids.remove(&join_id);
                    let status = if result.success {
                        TaskStatus::Completed
                    } else {
                        TaskStatus::Failed
                    };
                    if result.success {
                        info!(task = %task_id, elapsed_ms = result.duration_ms, "task completed");
                    } else {
                        error!(
                            task = %task_id,
                            error = result.error.as_deref().unwrap_or("non-zero exit"),
                            "task failed",
                        );
                    }
                    graph.set_status(&task_id, status)?;
                    results.insert(task_id, result);
                }
                Some(Err(join_error)) => {
                    // A panicking driver loses its output but not the run
                    if let Some(task_id) = task_ids.remove(&join_error.id()) {
                        error!(task = %task_id, "driver task aborted");
                        graph.set_status(&task_id, TaskStatus::Failed)?;
                        results.insert(
                            task_id.clone(),
                            ExecutionResult::failure(task_id, "driver task aborted", 0),
                        );
                    }
                }
                None => {}
            }
        }

        let mut summary = ExecutionSummary {
            results,
            ..ExecutionSummary::default()
        };
        for node in graph.nodes() {
            match graph.status(&node.id) {
                Some(TaskStatus::Completed) => summary.completed.push(node.id.clone()),
                Some(TaskStatus::Failed) => summary.failed.push(node.id.clone()),
                Some(TaskStatus::Skipped) => summary.skipped.push(node.id.clone()),
                _ => {}
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
