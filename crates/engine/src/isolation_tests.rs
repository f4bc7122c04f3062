// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use vibe_core::test_support::{task, task_with_deps};
use vibe_core::{CountingIdGen, TaskId};
use yare::parameterized;

fn isolator(config: IsolationConfig) -> ContextIsolator<CountingIdGen> {
    ContextIsolator::new(config, CountingIdGen::new("ctx"))
}

fn ok_result(id: &str, stdout: &str) -> ExecutionResult {
    ExecutionResult {
        task_id: TaskId::new(id),
        success: true,
        exit_code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
        duration_ms: 5,
        modified_files: Vec::new(),
        error: None,
    }
}

#[test]
fn snapshot_carries_task_invariants() {
    let isolator = isolator(IsolationConfig::default());
    let mut node = task("build");
    node.cwd = Some("/srv/app".into());
    node.env = vec![("STAGE".to_string(), "ci".to_string())];

    let context = isolator.create_context(&node, &[], &[]);

    assert_eq!(context.task_id, "build");
    assert!(context.content.contains("# Task build"));
    assert!(context.content.contains("Command: run-build"));
    assert!(context.content.contains("Working directory: /srv/app"));
    assert!(context.content.contains("STAGE=ci"));
    assert!(!context.truncated);
    assert!(context.summary.is_none());
    // Intrinsic overhead dominates a small snapshot
    assert!(context.base_tokens > 1_000);
}

#[test]
fn failed_dependencies_are_filtered_by_default() {
    let isolator = isolator(IsolationConfig::default());
    let node = task_with_deps("deploy", &["build", "test"]);
    let results = vec![
        ok_result("build", "artifacts written"),
        ExecutionResult::failure(TaskId::new("test"), "3 tests failed", 9),
    ];

    let context = isolator.create_context(&node, &results, &[]);

    assert!(context.content.contains("build (ok): artifacts written"));
    assert!(!context.content.contains("test (failed)"));
    assert_eq!(context.dependency_ids, vec![TaskId::new("build"), TaskId::new("test")]);
}

#[test]
fn failed_dependencies_can_be_included() {
    let isolator = isolator(IsolationConfig {
        include_failed_dependencies: true,
        ..IsolationConfig::default()
    });
    let node = task_with_deps("deploy", &["test"]);
    let results = vec![ExecutionResult::failure(TaskId::new("test"), "3 tests failed", 9)];

    let context = isolator.create_context(&node, &results, &[]);
    assert!(context.content.contains("test (failed): 3 tests failed"));
}

#[test]
fn history_window_is_bounded() {
    let isolator = isolator(IsolationConfig {
        history_limit: 2,
        ..IsolationConfig::default()
    });
    let history = vec![
        Message::user("oldest"),
        Message::user("middle"),
        Message::user("newest"),
    ];

    let context = isolator.create_context(&task("t"), &[], &history);
    assert!(!context.content.contains("oldest"));
    assert!(context.content.contains("middle"));
    assert!(context.content.contains("newest"));
}

#[test]
fn oversize_snapshot_is_truncated_with_summary() {
    let isolator = isolator(IsolationConfig {
        max_tokens: 1_100,
        ..IsolationConfig::default()
    });
    let mut node = task("big");
    node.command = "x".repeat(4_000);

    let context = isolator.create_context(&node, &[], &[]);

    assert!(context.truncated);
    assert!(context.summary.unwrap().contains("truncated"));
    assert!(context.base_tokens > context.max_tokens);
    // 100 tokens of budget beyond the overhead
    assert_eq!(context.content.chars().count(), 400);
}

#[parameterized(
    high_priority = { Some(10), &[], IsolationLevel::Strict },
    priority_beats_fan_in = { Some(12), &["a", "b", "c", "d"], IsolationLevel::Strict },
    wide_fan_in = { None, &["a", "b", "c", "d"], IsolationLevel::Loose },
    narrow = { None, &["a"], IsolationLevel::Moderate },
    default = { None, &[], IsolationLevel::Moderate },
)]
fn isolation_levels(priority: Option<i64>, deps: &[&str], expected: IsolationLevel) {
    let isolator = isolator(IsolationConfig::default());
    let mut node = task_with_deps("t", deps);
    node.priority = priority;

    let context = isolator.create_context(&node, &[], &[]);
    assert_eq!(context.isolation_level, expected);
}

#[test]
fn snapshots_get_distinct_context_ids() {
    let isolator = isolator(IsolationConfig::default());
    let a = isolator.create_context(&task("t"), &[], &[]);
    let b = isolator.create_context(&task("t"), &[], &[]);
    assert_ne!(a.context_id, b.context_id);
}
