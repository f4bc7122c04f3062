// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{Message, TaskId, TaskNode};

// ── Message factory functions ───────────────────────────────────────────────

/// A short user/thought/tool/reply exchange ending with a user prompt.
pub fn conversation(turns: usize) -> Vec<Message> {
    let mut messages = Vec::new();
    for i in 0..turns {
        messages.push(Message::user(format!("prompt {}", i)).with_timestamp(1_000 + i as u64));
        messages.push(Message::thought(format!("thinking about {}", i)));
        messages.push(Message::tool(format!("tool output {}", i)));
        messages.push(Message::reply(format!("reply {}", i)));
    }
    messages.push(Message::user("current prompt").with_timestamp(2_000 + turns as u64));
    messages
}

// ── Task factory functions ──────────────────────────────────────────────────

pub fn task(id: &str) -> TaskNode {
    TaskNode::new(id, format!("run-{}", id))
}

pub fn task_with_deps(id: &str, deps: &[&str]) -> TaskNode {
    TaskNode::new(id, format!("run-{}", id))
        .with_deps(deps.iter().map(|d| TaskId::new(*d)))
}
