//! Shared helpers for the behavioral specs.

pub use tempfile::{tempdir, TempDir};
pub use vibe_core::test_support::{task, task_with_deps};
pub use vibe_core::{CountingIdGen, FakeClock, Message, Metadata, TaskId};

/// A task context good enough for driver-level specs.
pub fn bare_context(task_id: &str) -> vibe_core::TaskContext {
    vibe_core::TaskContext {
        context_id: vibe_core::ContextId::new("ctx"),
        task_id: TaskId::new(task_id),
        base_tokens: 1_000,
        max_tokens: 8_000,
        truncated: false,
        dependency_ids: Vec::new(),
        summary: None,
        isolation_level: vibe_core::IsolationLevel::Moderate,
        content: String::new(),
    }
}
