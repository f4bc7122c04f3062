// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task DAG with validation, cycle detection, and topological sort.
//!
//! Nodes live in an insertion-ordered arena keyed by task id; edges and
//! dependency lists reference ids, never pointers. Mutations fail fast on
//! duplicate nodes or unknown endpoints; `validate` enumerates every
//! issue at once for reporting.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;
use vibe_core::{TaskId, TaskNode, TaskStatus};

/// Errors that can occur when mutating a task graph
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate task: {0}")]
    DuplicateTask(TaskId),
    #[error("unknown task referenced by edge: {0}")]
    UnknownTask(TaskId),
    #[error("duplicate edge: {0} -> {1}")]
    DuplicateEdge(TaskId, TaskId),
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error("invalid transition for {task}: {from:?} -> {to:?}")]
    InvalidTransition {
        task: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },
}

/// A directed edge: `from` must complete before `to` may start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: TaskId,
    pub to: TaskId,
}

/// Everything `validate` found.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Result of a topological sort.
#[derive(Debug, Clone, Default)]
pub struct TopoSort {
    /// Every edge goes forward within this order
    pub sorted: Vec<TaskId>,
    /// Nodes Kahn's algorithm could not place (cycle members)
    pub unreachable: Vec<TaskId>,
}

/// Insertion-ordered task DAG.
#[derive(Debug, Default, Clone)]
pub struct TaskGraph {
    nodes: IndexMap<TaskId, TaskNode>,
    statuses: HashMap<TaskId, TaskStatus>,
    edges: Vec<Edge>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load nodes without mutation-time checks.
    ///
    /// Dependency lists become edges verbatim, so a deserialized graph
    /// with dangling references loads fine and `validate` reports them.
    pub fn from_nodes(nodes: impl IntoIterator<Item = TaskNode>) -> Self {
        let mut graph = Self::new();
        for node in nodes {
            for dep in &node.depends_on {
                graph.edges.push(Edge {
                    from: dep.clone(),
                    to: node.id.clone(),
                });
            }
            graph.statuses.insert(node.id.clone(), TaskStatus::Pending);
            graph.nodes.insert(node.id.clone(), node);
        }
        graph
    }

    /// Add a node. Its dependency list must reference existing nodes.
    pub fn add_node(&mut self, node: TaskNode) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateTask(node.id));
        }
        for dep in &node.depends_on {
            if !self.nodes.contains_key(dep) {
                return Err(GraphError::UnknownTask(dep.clone()));
            }
        }
        for dep in &node.depends_on {
            self.edges.push(Edge {
                from: dep.clone(),
                to: node.id.clone(),
            });
        }
        self.statuses.insert(node.id.clone(), TaskStatus::Pending);
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Add an edge between existing nodes, keeping the target's
    /// dependency list in sync.
    pub fn add_edge(&mut self, from: &TaskId, to: &TaskId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(from) {
            return Err(GraphError::UnknownTask(from.clone()));
        }
        if !self.nodes.contains_key(to) {
            return Err(GraphError::UnknownTask(to.clone()));
        }
        if self.edges.iter().any(|e| &e.from == from && &e.to == to) {
            return Err(GraphError::DuplicateEdge(from.clone(), to.clone()));
        }
        self.edges.push(Edge {
            from: from.clone(),
            to: to.clone(),
        });
        if let Some(node) = self.nodes.get_mut(to) {
            if !node.depends_on.contains(from) {
                node.depends_on.push(from.clone());
            }
        }
        Ok(())
    }

    pub fn node(&self, id: &TaskId) -> Option<&TaskNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn status(&self, id: &TaskId) -> Option<TaskStatus> {
        self.statuses.get(id).copied()
    }

    /// Transition a task's status, enforcing the lifecycle
    /// pending → running → completed | failed, with skipped reachable
    /// only from pending.
    pub fn set_status(&mut self, id: &TaskId, to: TaskStatus) -> Result<(), GraphError> {
        let Some(&from) = self.statuses.get(id) else {
            return Err(GraphError::TaskNotFound(id.clone()));
        };
        let allowed = matches!(
            (from, to),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
                | (TaskStatus::Pending, TaskStatus::Skipped)
        );
        if !allowed {
            return Err(GraphError::InvalidTransition {
                task: id.clone(),
                from,
                to,
            });
        }
        self.statuses.insert(id.clone(), to);
        Ok(())
    }

    /// Direct dependencies of a node, from the edge set.
    pub fn dependencies(&self, id: &TaskId) -> Vec<&TaskId> {
        self.edges
            .iter()
            .filter(|e| &e.to == id)
            .map(|e| &e.from)
            .collect()
    }

    /// Pending nodes whose dependencies have all completed.
    pub fn ready_tasks(&self) -> Vec<&TaskNode> {
        self.nodes
            .values()
            .filter(|node| {
                self.status(&node.id) == Some(TaskStatus::Pending)
                    && self
                        .dependencies(&node.id)
                        .iter()
                        .all(|dep| self.status(dep) == Some(TaskStatus::Completed))
            })
            .collect()
    }

    /// Skip every pending node downstream of a failure.
    ///
    /// Returns the ids skipped. Failed nodes block dependents; the skip
    /// is applied transitively.
    pub fn skip_blocked(&mut self) -> Vec<TaskId> {
        let mut skipped = Vec::new();
        loop {
            let blocked: Vec<TaskId> = self
                .nodes
                .keys()
                .filter(|id| {
                    self.status(id) == Some(TaskStatus::Pending)
                        && self.dependencies(id).iter().any(|dep| {
                            matches!(
                                self.status(dep),
                                Some(TaskStatus::Failed) | Some(TaskStatus::Skipped)
                            )
                        })
                })
                .cloned()
                .collect();
            if blocked.is_empty() {
                break;
            }
            for id in blocked {
                self.statuses.insert(id.clone(), TaskStatus::Skipped);
                skipped.push(id);
            }
        }
        skipped
    }

    /// True when every node reached a terminal status.
    pub fn is_settled(&self) -> bool {
        self.statuses.values().all(TaskStatus::is_terminal)
    }

    /// Enumerate all structural issues.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        if self.nodes.is_empty() {
            report.errors.push("graph has no tasks".to_string());
            return report;
        }

        for edge in &self.edges {
            for end in [&edge.from, &edge.to] {
                if !self.nodes.contains_key(end) {
                    report.errors.push(format!(
                        "edge {} -> {} references unknown task {}",
                        edge.from, edge.to, end
                    ));
                }
            }
        }

        if let Some(cycle) = self.detect_cycles() {
            let path = cycle
                .iter()
                .map(TaskId::as_str)
                .collect::<Vec<_>>()
                .join(" -> ");
            report.errors.push(format!("cycle detected: {}", path));
        }

        for id in self.unreachable_from_roots() {
            report
                .warnings
                .push(format!("task {} is unreachable from any root", id));
        }

        report
    }

    /// DFS cycle detection with recursion-stack tracking.
    ///
    /// Returns the cycle path (first node repeated at the end) or `None`.
    pub fn detect_cycles(&self) -> Option<Vec<TaskId>> {
        let mut visited: HashSet<&TaskId> = HashSet::new();
        let mut stack: Vec<&TaskId> = Vec::new();
        let mut on_stack: HashSet<&TaskId> = HashSet::new();

        for start in self.nodes.keys() {
            if visited.contains(start) {
                continue;
            }
            if let Some(cycle) = self.dfs_cycle(start, &mut visited, &mut stack, &mut on_stack) {
                return Some(cycle);
            }
        }
        None
    }

    fn dfs_cycle<'a>(
        &'a self,
        node: &'a TaskId,
        visited: &mut HashSet<&'a TaskId>,
        stack: &mut Vec<&'a TaskId>,
        on_stack: &mut HashSet<&'a TaskId>,
    ) -> Option<Vec<TaskId>> {
        visited.insert(node);
        stack.push(node);
        on_stack.insert(node);

        for edge in self.edges.iter().filter(|e| &e.from == node) {
            let next = &edge.to;
            if !self.nodes.contains_key(next) {
                continue;
            }
            if on_stack.contains(next) {
                // Slice the stack from the cycle entry point
                let entry = stack.iter().position(|id| *id == next).unwrap_or(0);
                let mut cycle: Vec<TaskId> = stack[entry..].iter().map(|id| (*id).clone()).collect();
                cycle.push(next.clone());
                return Some(cycle);
            }
            if !visited.contains(next) {
                if let Some(cycle) = self.dfs_cycle(next, visited, stack, on_stack) {
                    return Some(cycle);
                }
            }
        }

        stack.pop();
        on_stack.remove(node);
        None
    }

    /// Kahn's algorithm over in-degrees.
    pub fn topological_sort(&self) -> TopoSort {
        let mut in_degree: HashMap<&TaskId, usize> =
            self.nodes.keys().map(|id| (id, 0)).collect();
        for edge in &self.edges {
            if let Some(d) = in_degree.get_mut(&edge.to) {
                *d += 1;
            }
        }

        let mut queue: VecDeque<&TaskId> = self
            .nodes
            .keys()
            .filter(|id| in_degree.get(*id) == Some(&0))
            .collect();
        let mut sorted = Vec::new();

        while let Some(id) = queue.pop_front() {
            sorted.push(id.clone());
            for edge in self.edges.iter().filter(|e| &e.from == id) {
                if let Some(d) = in_degree.get_mut(&edge.to) {
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(&edge.to);
                    }
                }
            }
        }

        let placed: HashSet<&TaskId> = sorted.iter().collect();
        let unreachable = self
            .nodes
            .keys()
            .filter(|id| !placed.contains(id))
            .cloned()
            .collect();

        TopoSort {
            sorted,
            unreachable,
        }
    }

    /// Nodes with no path from any in-degree-zero root.
    fn unreachable_from_roots(&self) -> Vec<TaskId> {
        let has_incoming: HashSet<&TaskId> = self.edges.iter().map(|e| &e.to).collect();
        let mut queue: VecDeque<&TaskId> = self
            .nodes
            .keys()
            .filter(|id| !has_incoming.contains(id))
            .collect();

        let mut reached: HashSet<&TaskId> = queue.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            for edge in self.edges.iter().filter(|e| &e.from == id) {
                if self.nodes.contains_key(&edge.to) && reached.insert(&edge.to) {
                    queue.push_back(&edge.to);
                }
            }
        }

        self.nodes
            .keys()
            .filter(|id| !reached.contains(id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
