// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Parallel task graph engine for the Vibe Flow context management core.
//!
//! Validates and executes task DAGs with a concurrency cap, building an
//! isolated context snapshot per task, plus a reusable worker pool for
//! CPU-bound transforms.

pub mod executor;
pub mod graph;
pub mod isolation;
pub mod pool;

pub use executor::{ExecutionSummary, ExecutorConfig, ExecutorError, GraphExecutor};
pub use graph::{Edge, GraphError, TaskGraph, TopoSort, ValidationReport};
pub use isolation::{ContextIsolator, IsolationConfig};
pub use pool::{global_pool, init_global_pool, PoolConfig, PoolError, WorkItem, WorkerPool};
