//! Task graph specs
//!
//! The S5 diamond scenario plus full execution through the engine.

use crate::prelude::*;
use vibe_adapters::FakeDriver;
use vibe_core::TaskStatus;
use vibe_engine::{ContextIsolator, ExecutorConfig, GraphExecutor, IsolationConfig, TaskGraph};

fn diamond() -> TaskGraph {
    let mut graph = TaskGraph::new();
    graph.add_node(task("A")).unwrap();
    graph.add_node(task_with_deps("B", &["A"])).unwrap();
    graph.add_node(task_with_deps("C", &["A"])).unwrap();
    graph.add_node(task_with_deps("D", &["B", "C"])).unwrap();
    graph
}

#[test]
fn diamond_topology_sorts_a_first_d_last() {
    let graph = diamond();
    assert!(graph.validate().is_valid());

    let topo = graph.topological_sort();
    assert_eq!(topo.sorted.first().map(TaskId::as_str), Some("A"));
    assert_eq!(topo.sorted.last().map(TaskId::as_str), Some("D"));
    assert!(topo.unreachable.is_empty());
}

#[test]
fn ready_set_tracks_completion() {
    let mut graph = diamond();

    let ready: Vec<&str> = graph.ready_tasks().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ready, vec!["A"]);

    graph.set_status(&TaskId::new("A"), TaskStatus::Running).unwrap();
    graph.set_status(&TaskId::new("A"), TaskStatus::Completed).unwrap();

    let ready: Vec<&str> = graph.ready_tasks().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ready, vec!["B", "C"]);
}

#[test]
fn closing_the_diamond_creates_a_reported_cycle() {
    let mut graph = diamond();
    graph.add_edge(&TaskId::new("D"), &TaskId::new("A")).unwrap();

    let cycle = graph.detect_cycles().unwrap();
    assert_eq!(cycle.first(), cycle.last());
    assert!(!graph.validate().is_valid());
}

#[tokio::test]
async fn engine_runs_the_diamond_to_completion() {
    let driver = FakeDriver::new();
    let executor = GraphExecutor::new(
        driver.clone(),
        ContextIsolator::new(IsolationConfig::default(), CountingIdGen::new("ctx")),
        ExecutorConfig { max_concurrent: 2 },
    );

    let summary = executor.run(diamond()).await.unwrap();
    assert_eq!(summary.completed.len(), 4);

    let order: Vec<String> = driver
        .calls()
        .iter()
        .map(|c| c.task_id.to_string())
        .collect();
    assert_eq!(order[0], "A");
    assert_eq!(order[3], "D");
}
