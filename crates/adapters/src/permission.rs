// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Policy-gated tool invocation with an approval cache.
//!
//! Rules map tool-name patterns (`*`, `prefix*`, `*suffix`, exact) to
//! allow/deny/ask; the first matching rule wins and an absent match takes
//! the default action. Ask prompts the operator: `y`/`yes` allows once,
//! `a`/`always` caches the approval keyed by (tool, argument hash) for a
//! TTL, anything else denies. Denial is a non-error result and the
//! wrapped executor is never invoked.

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use vibe_core::{Clock, IdGen};

/// What a rule decides for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    Allow,
    Deny,
    Ask,
}

/// One policy rule.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PolicyRule {
    /// `*`, `prefix*`, `*suffix`, or an exact tool name
    pub pattern: String,
    pub action: PolicyAction,
}

impl PolicyRule {
    pub fn new(pattern: impl Into<String>, action: PolicyAction) -> Self {
        Self {
            pattern: pattern.into(),
            action,
        }
    }

    fn matches(&self, tool: &str) -> bool {
        let pattern = self.pattern.as_str();
        if pattern == "*" || pattern == tool {
            return true;
        }
        if let Some(prefix) = pattern.strip_suffix('*') {
            if !prefix.is_empty() && tool.starts_with(prefix) {
                return true;
            }
        }
        if let Some(suffix) = pattern.strip_prefix('*') {
            if !suffix.is_empty() && tool.ends_with(suffix) {
                return true;
            }
        }
        false
    }
}

/// Middleware policy.
#[derive(Debug, Clone)]
pub struct PermissionConfig {
    pub rules: Vec<PolicyRule>,
    pub default_action: PolicyAction,
    /// How long an `always` approval stays cached
    pub approval_ttl: Duration,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            default_action: PolicyAction::Ask,
            approval_ttl: Duration::from_secs(30 * 60),
        }
    }
}

/// One gated invocation.
#[derive(Debug, Clone)]
pub struct PermissionRequest {
    pub tool: String,
    pub arguments: serde_json::Value,
    /// Request timestamp in ms since epoch
    pub timestamp: u64,
    pub caller: String,
}

/// Operator-facing prompt. Answers follow the y/yes/a/always convention.
#[async_trait]
pub trait ApprovalPrompt: Send + Sync {
    async fn ask(&self, request: &PermissionRequest) -> String;
}

/// Outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDecision {
    pub allowed: bool,
    pub message: String,
    /// The decision came from a cached `always` approval
    pub cached: bool,
}

/// Outcome of a wrapped execution.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub execution_id: String,
    pub duration_ms: u64,
}

/// Policy-gated execution wrapper.
pub struct PermissionMiddleware<P: ApprovalPrompt, C: Clock, G: IdGen> {
    config: PermissionConfig,
    prompt: P,
    clock: C,
    id_gen: G,
    /// (tool, argument-hash) -> approval expiry
    approvals: Mutex<HashMap<String, Instant>>,
}

impl<P: ApprovalPrompt, C: Clock, G: IdGen> PermissionMiddleware<P, C, G> {
    pub fn new(config: PermissionConfig, prompt: P, clock: C, id_gen: G) -> Self {
        Self {
            config,
            prompt,
            clock,
            id_gen,
            approvals: Mutex::new(HashMap::new()),
        }
    }

    /// Action the rule table takes for a tool. First match wins.
    pub fn action_for(&self, tool: &str) -> PolicyAction {
        self.config
            .rules
            .iter()
            .find(|rule| rule.matches(tool))
            .map(|rule| rule.action)
            .unwrap_or(self.config.default_action)
    }

    /// Decide whether a request may proceed, prompting if policy says ask.
    pub async fn check(&self, request: &PermissionRequest) -> PermissionDecision {
        match self.action_for(&request.tool) {
            PolicyAction::Allow => PermissionDecision {
                allowed: true,
                message: format!("tool {} allowed by policy", request.tool),
                cached: false,
            },
            PolicyAction::Deny => PermissionDecision {
                allowed: false,
                message: format!("tool {} denied by policy", request.tool),
                cached: false,
            },
            PolicyAction::Ask => self.ask_operator(request).await,
        }
    }

    async fn ask_operator(&self, request: &PermissionRequest) -> PermissionDecision {
        let key = approval_key(&request.tool, &request.arguments);

        {
            let mut approvals = self.approvals.lock();
            if let Some(expiry) = approvals.get(&key) {
                if self.clock.monotonic() < *expiry {
                    debug!(tool = %request.tool, "approval cache hit");
                    return PermissionDecision {
                        allowed: true,
                        message: format!("tool {} approved (cached)", request.tool),
                        cached: true,
                    };
                }
                // TTL elapsed: re-request
                approvals.remove(&key);
            }
        }

        let answer = self.prompt.ask(request).await;
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => PermissionDecision {
                allowed: true,
                message: format!("tool {} approved once", request.tool),
                cached: false,
            },
            "a" | "always" => {
                let expiry = self.clock.monotonic() + self.config.approval_ttl;
                self.approvals.lock().insert(key, expiry);
                info!(tool = %request.tool, "approval cached");
                PermissionDecision {
                    allowed: true,
                    message: format!("tool {} approved and cached", request.tool),
                    cached: false,
                }
            }
            _ => PermissionDecision {
                allowed: false,
                message: format!("tool {} denied by operator", request.tool),
                cached: false,
            },
        }
    }

    /// Gate and run an executor.
    ///
    /// A denial returns `success: false` without invoking the executor;
    /// executor errors are captured, never thrown.
    pub async fn execute<F, Fut>(
        &self,
        request: &PermissionRequest,
        executor: F,
    ) -> ExecutionOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<serde_json::Value, String>>,
    {
        let execution_id = self.id_gen.mint();
        let started = self.clock.monotonic();

        let decision = self.check(request).await;
        if !decision.allowed {
            return ExecutionOutcome {
                success: false,
                result: None,
                error: Some(decision.message),
                execution_id,
                duration_ms: elapsed_ms(&self.clock, started),
            };
        }

        match executor().await {
            Ok(result) => ExecutionOutcome {
                success: true,
                result: Some(result),
                error: None,
                execution_id,
                duration_ms: elapsed_ms(&self.clock, started),
            },
            Err(e) => ExecutionOutcome {
                success: false,
                result: None,
                error: Some(e),
                execution_id,
                duration_ms: elapsed_ms(&self.clock, started),
            },
        }
    }
}

fn elapsed_ms<C: Clock>(clock: &C, started: Instant) -> u64 {
    clock.monotonic().saturating_duration_since(started).as_millis() as u64
}

/// Cache key: tool name plus a digest of the canonical argument JSON.
fn approval_key(tool: &str, arguments: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(arguments.to_string().as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}:{}", tool, hex)
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    //! Fake approval prompt for deterministic testing
    #![cfg_attr(coverage_nightly, coverage(off))]

    use super::{ApprovalPrompt, PermissionRequest};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Scripted prompt: pops answers front-to-back, denies when empty.
    #[derive(Clone, Default)]
    pub struct FakePrompt {
        inner: Arc<Mutex<FakePromptState>>,
    }

    #[derive(Default)]
    struct FakePromptState {
        answers: Vec<String>,
        asked: Vec<PermissionRequest>,
    }

    impl FakePrompt {
        pub fn answering(answers: &[&str]) -> Self {
            let prompt = Self::default();
            prompt.inner.lock().answers = answers.iter().map(|a| a.to_string()).collect();
            prompt
        }

        /// Requests the operator was shown.
        pub fn asked(&self) -> Vec<PermissionRequest> {
            self.inner.lock().asked.clone()
        }
    }

    #[async_trait]
    impl ApprovalPrompt for FakePrompt {
        async fn ask(&self, request: &PermissionRequest) -> String {
            let mut state = self.inner.lock();
            state.asked.push(request.clone());
            if state.answers.is_empty() {
                "n".to_string()
            } else {
                state.answers.remove(0)
            }
        }
    }
}

#[cfg(test)]
#[path = "permission_tests.rs"]
mod tests;
