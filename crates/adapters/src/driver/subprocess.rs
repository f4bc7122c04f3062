// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess task driver.
//!
//! Runs a task's command through `sh -c` with the context snapshot
//! exposed via `VIBE_TASK_CONTEXT`. The child is killed automatically if
//! the deadline elapses (via the tokio `Child` drop implementation).

use super::{DriverError, DriverOutput, TaskDriver};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;
use vibe_core::{TaskContext, TaskNode};

/// Default deadline for a task command.
///
/// Ten minutes as a safety net for long-running sub-agents; tasks narrow
/// it per-node via `timeout_ms`.
pub const TASK_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// Shell-backed driver.
#[derive(Debug, Clone)]
pub struct SubprocessDriver {
    timeout: Duration,
}

impl Default for SubprocessDriver {
    fn default() -> Self {
        Self {
            timeout: TASK_COMMAND_TIMEOUT,
        }
    }
}

impl SubprocessDriver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl TaskDriver for SubprocessDriver {
    async fn run(
        &self,
        task: &TaskNode,
        context: &TaskContext,
    ) -> Result<DriverOutput, DriverError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&task.command);
        if let Some(cwd) = &task.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &task.env {
            cmd.env(key, value);
        }
        cmd.env("VIBE_TASK_CONTEXT", &context.content);

        let timeout = task
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.timeout);

        debug!(task = %task.id, timeout_s = timeout.as_secs(), "spawning task command");

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(io_err)) => return Err(DriverError::SpawnFailed(io_err.to_string())),
            Err(_elapsed) => return Err(DriverError::Timeout(timeout)),
        };

        Ok(DriverOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            modified_files: Vec::new(),
        })
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
