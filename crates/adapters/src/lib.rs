// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Driver, retry, and permission adapters for the Vibe Flow core.
//!
//! Everything that talks to the outside (sub-agent processes, provider
//! errors, the operator) lives behind a trait here so the engine stays
//! deterministic in tests.

pub mod driver;
pub mod permission;
pub mod retry;
pub mod router;

pub use driver::{DriverError, DriverOutput, SubprocessDriver, TaskDriver};
pub use permission::{
    ApprovalPrompt, ExecutionOutcome, PermissionConfig, PermissionDecision, PermissionMiddleware,
    PermissionRequest, PolicyAction, PolicyRule,
};
pub use retry::{
    detect, execute_with_retry, Provider, RateLimitInfo, RateLimitKind, RetryConfig, RetryOutcome,
};
pub use router::{CircuitState, DriverKind, DriverRouter, RoutedResult, RouterConfig};

#[cfg(any(test, feature = "test-support"))]
pub use driver::fake::{DriverCall, FakeDriver};
#[cfg(any(test, feature = "test-support"))]
pub use permission::fake::FakePrompt;
