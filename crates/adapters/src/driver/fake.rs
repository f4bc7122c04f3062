// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake task driver for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{DriverError, DriverOutput, TaskDriver};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use vibe_core::{TaskContext, TaskId, TaskNode};

/// Recorded call to FakeDriver
#[derive(Debug, Clone)]
pub struct DriverCall {
    pub task_id: TaskId,
    pub command: String,
    pub context_tokens: usize,
}

/// Scripted response kind for one task.
#[derive(Debug, Clone)]
enum Script {
    Succeed(String),
    FailOnce(String),
    FailAlways(String),
    Delay(Duration, String),
}

/// Fake driver for testing
///
/// Allows per-task scripted outcomes and records all calls.
#[derive(Clone, Default)]
pub struct FakeDriver {
    inner: Arc<Mutex<FakeDriverState>>,
}

#[derive(Default)]
struct FakeDriverState {
    scripts: HashMap<TaskId, Script>,
    calls: Vec<DriverCall>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful run for a task.
    pub fn succeed(&self, task_id: &str, stdout: &str) {
        self.inner
            .lock()
            .scripts
            .insert(TaskId::new(task_id), Script::Succeed(stdout.to_string()));
    }

    /// Script a single failure; subsequent runs succeed with empty output.
    pub fn fail_once(&self, task_id: &str, error: &str) {
        self.inner
            .lock()
            .scripts
            .insert(TaskId::new(task_id), Script::FailOnce(error.to_string()));
    }

    /// Script every run of a task to fail.
    pub fn fail_always(&self, task_id: &str, error: &str) {
        self.inner
            .lock()
            .scripts
            .insert(TaskId::new(task_id), Script::FailAlways(error.to_string()));
    }

    /// Script a slow success, for concurrency tests.
    pub fn delay(&self, task_id: &str, delay: Duration, stdout: &str) {
        self.inner.lock().scripts.insert(
            TaskId::new(task_id),
            Script::Delay(delay, stdout.to_string()),
        );
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<DriverCall> {
        self.inner.lock().calls.clone()
    }

    /// Calls recorded for one task.
    pub fn calls_for(&self, task_id: &str) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| c.task_id == task_id)
            .count()
    }
}

#[async_trait]
impl TaskDriver for FakeDriver {
    async fn run(
        &self,
        task: &TaskNode,
        context: &TaskContext,
    ) -> Result<DriverOutput, DriverError> {
        let script = {
            let mut inner = self.inner.lock();
            inner.calls.push(DriverCall {
                task_id: task.id.clone(),
                command: task.command.clone(),
                context_tokens: context.base_tokens,
            });
            inner.scripts.get(&task.id).cloned()
        };

        match script {
            None => Ok(DriverOutput::ok("")),
            Some(Script::Succeed(stdout)) => Ok(DriverOutput::ok(stdout)),
            Some(Script::FailAlways(error)) => Err(DriverError::Failed(error)),
            Some(Script::FailOnce(error)) => {
                self.inner
                    .lock()
                    .scripts
                    .insert(task.id.clone(), Script::Succeed(String::new()));
                Err(DriverError::Failed(error))
            }
            Some(Script::Delay(delay, stdout)) => {
                tokio::time::sleep(delay).await;
                Ok(DriverOutput::ok(stdout))
            }
        }
    }
}
