// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Circuit-breaker failover between a primary and a fallback driver.
//!
//! Closed: tasks go to the primary. A rate-limit-class failure reroutes
//! to the fallback silently without touching the failure counter; any
//! other failure counts toward the threshold. Open: everything goes to
//! the fallback until the cooldown elapses. Half-open: one primary probe;
//! success closes the circuit, failure reopens it. The fallback path is
//! never retried here; that is the rate-limit handler's job.

use crate::driver::{DriverError, DriverOutput, TaskDriver};
use crate::retry::looks_rate_limited;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use vibe_core::{Clock, TaskContext, TaskNode};

/// Which driver served a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    Primary,
    Fallback,
}

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Breaker thresholds.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Consecutive counted failures that open the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before a half-open probe
    pub cooldown: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Routed execution outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedResult {
    pub success: bool,
    pub output: Option<DriverOutput>,
    pub error: Option<String>,
    pub driver_used: DriverKind,
}

impl RoutedResult {
    fn from_driver(
        result: Result<DriverOutput, DriverError>,
        driver_used: DriverKind,
    ) -> Self {
        match result {
            Ok(output) => Self {
                success: true,
                output: Some(output),
                error: None,
                driver_used,
            },
            Err(e) => Self {
                success: false,
                output: None,
                error: Some(e.to_string()),
                driver_used,
            },
        }
    }
}

struct Breaker {
    consecutive_failures: u32,
    state: CircuitState,
    opened_at: Option<Instant>,
}

/// Router between two drivers with a per-router circuit breaker.
#[derive(Clone)]
pub struct DriverRouter<P, F, C: Clock> {
    primary: P,
    fallback: F,
    clock: C,
    config: RouterConfig,
    breaker: Arc<Mutex<Breaker>>,
}

impl<P, F, C> DriverRouter<P, F, C>
where
    P: TaskDriver,
    F: TaskDriver,
    C: Clock,
{
    pub fn new(primary: P, fallback: F, config: RouterConfig, clock: C) -> Self {
        Self {
            primary,
            fallback,
            clock,
            config,
            breaker: Arc::new(Mutex::new(Breaker {
                consecutive_failures: 0,
                state: CircuitState::Closed,
                opened_at: None,
            })),
        }
    }

    /// Current breaker state, cooldown transitions applied.
    pub fn circuit_state(&self) -> CircuitState {
        self.effective_state()
    }

    /// Current consecutive counted failures.
    pub fn failure_count(&self) -> u32 {
        self.breaker.lock().consecutive_failures
    }

    /// Route one task.
    pub async fn execute_task(&self, task: &TaskNode, context: &TaskContext) -> RoutedResult {
        match self.effective_state() {
            CircuitState::Open => {
                let result = self.fallback.run(task, context).await;
                RoutedResult::from_driver(result, DriverKind::Fallback)
            }
            CircuitState::Closed => match self.primary.run(task, context).await {
                Ok(output) => {
                    self.record_success();
                    RoutedResult::from_driver(Ok(output), DriverKind::Primary)
                }
                Err(e) if looks_rate_limited(&e.to_string()) => {
                    // Fallback class: silent reroute, counter untouched
                    info!(task = %task.id, error = %e, "primary rate limited, using fallback");
                    let result = self.fallback.run(task, context).await;
                    RoutedResult::from_driver(result, DriverKind::Fallback)
                }
                Err(e) => {
                    self.record_counted_failure();
                    RoutedResult::from_driver(Err(e), DriverKind::Primary)
                }
            },
            CircuitState::HalfOpen => match self.primary.run(task, context).await {
                Ok(output) => {
                    info!("half-open probe succeeded, closing circuit");
                    self.record_success();
                    RoutedResult::from_driver(Ok(output), DriverKind::Primary)
                }
                Err(e) => {
                    warn!(error = %e, "half-open probe failed, reopening circuit");
                    self.reopen();
                    if looks_rate_limited(&e.to_string()) {
                        let result = self.fallback.run(task, context).await;
                        RoutedResult::from_driver(result, DriverKind::Fallback)
                    } else {
                        RoutedResult::from_driver(Err(e), DriverKind::Primary)
                    }
                }
            },
        }
    }

    /// Breaker state with the open→half-open cooldown transition applied.
    fn effective_state(&self) -> CircuitState {
        let mut breaker = self.breaker.lock();
        if breaker.state == CircuitState::Open {
            let elapsed = breaker
                .opened_at
                .map(|at| self.clock.monotonic().saturating_duration_since(at))
                .unwrap_or_default();
            if elapsed >= self.config.cooldown {
                breaker.state = CircuitState::HalfOpen;
            }
        }
        breaker.state
    }

    fn record_success(&self) {
        let mut breaker = self.breaker.lock();
        breaker.consecutive_failures = 0;
        breaker.state = CircuitState::Closed;
        breaker.opened_at = None;
    }

    fn record_counted_failure(&self) {
        let mut breaker = self.breaker.lock();
        breaker.consecutive_failures += 1;
        if breaker.consecutive_failures >= self.config.failure_threshold {
            warn!(
                failures = breaker.consecutive_failures,
                "failure threshold reached, opening circuit",
            );
            breaker.state = CircuitState::Open;
            breaker.opened_at = Some(self.clock.monotonic());
        }
    }

    fn reopen(&self) {
        let mut breaker = self.breaker.lock();
        breaker.state = CircuitState::Open;
        breaker.opened_at = Some(self.clock.monotonic());
    }
}

/// The router is itself a driver, so the executor can stay agnostic.
#[async_trait]
impl<P, F, C> TaskDriver for DriverRouter<P, F, C>
where
    P: TaskDriver,
    F: TaskDriver,
    C: Clock + 'static,
{
    async fn run(
        &self,
        task: &TaskNode,
        context: &TaskContext,
    ) -> Result<DriverOutput, DriverError> {
        let routed = self.execute_task(task, context).await;
        match routed.output {
            Some(output) => Ok(output),
            None => Err(DriverError::Failed(
                routed.error.unwrap_or_else(|| "driver failed".to_string()),
            )),
        }
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
