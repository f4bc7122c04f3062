// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::isolation::{ContextIsolator, IsolationConfig};
use std::time::Duration;
use vibe_adapters::FakeDriver;
use vibe_core::test_support::{task, task_with_deps};
use vibe_core::{CountingIdGen, TaskId};

fn executor(driver: FakeDriver, max_concurrent: usize) -> GraphExecutor<FakeDriver, CountingIdGen> {
    GraphExecutor::new(
        driver,
        ContextIsolator::new(IsolationConfig::default(), CountingIdGen::new("ctx")),
        ExecutorConfig { max_concurrent },
    )
}

fn diamond() -> TaskGraph {
    let mut graph = TaskGraph::new();
    graph.add_node(task("A")).unwrap();
    graph.add_node(task_with_deps("B", &["A"])).unwrap();
    graph.add_node(task_with_deps("C", &["A"])).unwrap();
    graph.add_node(task_with_deps("D", &["B", "C"])).unwrap();
    graph
}

#[tokio::test]
async fn runs_whole_dag_in_dependency_order() {
    let driver = FakeDriver::new();
    driver.succeed("A", "a done");
    driver.succeed("D", "d done");

    let summary = executor(driver.clone(), 2).run(diamond()).await.unwrap();

    assert_eq!(summary.completed.len(), 4);
    assert!(summary.failed.is_empty());
    assert!(summary.skipped.is_empty());
    assert!(summary.results["D"].success);

    // A ran before B and C, which ran before D
    let order: Vec<String> = driver.calls().iter().map(|c| c.task_id.to_string()).collect();
    assert_eq!(order[0], "A");
    assert_eq!(order[3], "D");
}

#[tokio::test]
async fn dependency_results_reach_dependents() {
    let driver = FakeDriver::new();
    driver.succeed("A", "artifact list");

    let mut graph = TaskGraph::new();
    graph.add_node(task("A")).unwrap();
    graph.add_node(task_with_deps("B", &["A"])).unwrap();

    let summary = executor(driver, 1).run(graph).await.unwrap();
    assert_eq!(summary.completed.len(), 2);
    assert_eq!(summary.results["A"].stdout, "artifact list");
}

#[tokio::test]
async fn failure_skips_dependents_but_not_siblings() {
    let driver = FakeDriver::new();
    driver.fail_always("B", "build broke");

    let summary = executor(driver, 2).run(diamond()).await.unwrap();

    assert_eq!(summary.completed, vec![TaskId::new("A"), TaskId::new("C")]);
    assert_eq!(summary.failed, vec![TaskId::new("B")]);
    assert_eq!(summary.skipped, vec![TaskId::new("D")]);
    assert!(summary.results["B"]
        .error
        .as_deref()
        .unwrap()
        .contains("build broke"));
    // Skipped tasks never produce a result
    assert!(!summary.results.contains_key("D"));
}

#[tokio::test]
async fn invalid_graph_aborts_before_running() {
    let driver = FakeDriver::new();
    let mut graph = diamond();
    graph
        .add_edge(&"D".into(), &"A".into())
        .unwrap();

    let err = executor(driver.clone(), 2).run(graph).await.unwrap_err();
    assert!(matches!(err, ExecutorError::InvalidGraph(_)));
    assert!(driver.calls().is_empty());
}

#[tokio::test]
async fn independent_branches_run_in_parallel_up_to_cap() {
    let driver = FakeDriver::new();
    for id in ["A", "B", "C", "D"] {
        driver.delay(id, Duration::from_millis(40), "slow");
    }

    let mut graph = TaskGraph::new();
    for id in ["A", "B", "C", "D"] {
        graph.add_node(task(id)).unwrap();
    }

    let started = std::time::Instant::now();
    let summary = executor(driver, 2).run(graph).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(summary.completed.len(), 4);
    // Four 40ms tasks at concurrency 2 take about two batches, far less
    // than the serial 160ms
    assert!(elapsed >= Duration::from_millis(75));
    assert!(elapsed < Duration::from_millis(150));
}

#[tokio::test]
async fn single_worker_serializes_everything() {
    let driver = FakeDriver::new();
    let summary = executor(driver.clone(), 1).run(diamond()).await.unwrap();
    assert_eq!(summary.completed.len(), 4);
    assert_eq!(driver.calls().len(), 4);
}
