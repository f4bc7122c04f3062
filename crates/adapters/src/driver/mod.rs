// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sub-agent task drivers.
//!
//! A `TaskDriver` turns a task node plus its isolated context snapshot
//! into an execution outcome. The engine never cares which concrete
//! driver runs a task; the router composes two of them behind a circuit
//! breaker.

mod subprocess;

pub use subprocess::SubprocessDriver;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use vibe_core::{TaskContext, TaskNode};

/// Errors from driver operations
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("execution failed: {0}")]
    Failed(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// What a finished sub-agent produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub modified_files: Vec<PathBuf>,
}

impl DriverOutput {
    /// A zero-exit output carrying only stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            ..Self::default()
        }
    }
}

/// Adapter for running one task as a sub-agent.
#[async_trait]
pub trait TaskDriver: Clone + Send + Sync + 'static {
    /// Run the task to completion with the given context snapshot.
    async fn run(&self, task: &TaskNode, context: &TaskContext)
        -> Result<DriverOutput, DriverError>;
}
