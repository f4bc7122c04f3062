// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reusable worker pool for CPU-bound transforms.
//!
//! Workers are OS threads draining a FIFO queue; `execute` is the async
//! face, completing through a oneshot reply. Scheduling: a free worker
//! takes an item immediately; if none is idle and the pool is below
//! `max_workers` a new worker is spawned; otherwise the item waits.
//! Workers are recycled after `max_tasks_per_worker` items and released
//! when idle beyond `idle_timeout` (the idle check rides the queue wait,
//! no separate timers). Safe Rust cannot preempt a running computation,
//! so a deadline expiry rejects the item immediately and retires the
//! worker at its next boundary instead of killing it mid-task.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Base deadline granted to every work item.
const BASE_TIMEOUT: Duration = Duration::from_secs(5);

/// Extra deadline second granted per this many payload bytes.
const BYTES_PER_EXTRA_SECOND: usize = 10 * 1024;

/// Errors surfaced by the worker pool
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("work item timed out after {0:?}")]
    Timeout(Duration),
    #[error("work item failed: {0}")]
    Failed(String),
    #[error("work item panicked")]
    Panicked,
    #[error("pool is shutting down")]
    ShuttingDown,
    #[error("worker terminated before replying")]
    WorkerLost,
    #[error("global pool already initialized")]
    AlreadyInitialized,
}

/// A unit of CPU-bound work.
pub struct WorkItem {
    pub name: String,
    /// Size of the payload the job chews on; drives the dynamic deadline
    pub payload_bytes: usize,
    job: Box<dyn FnOnce() -> Result<String, String> + Send + 'static>,
}

impl WorkItem {
    pub fn new(
        name: impl Into<String>,
        payload_bytes: usize,
        job: impl FnOnce() -> Result<String, String> + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            payload_bytes,
            job: Box::new(job),
        }
    }
}

/// Pool sizing and lifecycle limits.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub min_workers: usize,
    pub max_workers: usize,
    /// Idle workers beyond `min_workers` are released after this long
    pub idle_timeout: Duration,
    /// Items a worker may run before it is recycled
    pub max_tasks_per_worker: usize,
    /// Upper bound on any item's dynamic deadline
    pub max_task_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_workers: 1,
            max_workers: 4,
            idle_timeout: Duration::from_secs(30),
            max_tasks_per_worker: 100,
            max_task_timeout: Duration::from_secs(60),
        }
    }
}

struct QueuedItem {
    name: String,
    job: Box<dyn FnOnce() -> Result<String, String> + Send + 'static>,
    reply: oneshot::Sender<Result<String, PoolError>>,
    /// Set by the waiter on deadline expiry
    cancelled: Arc<AtomicBool>,
}

struct PoolState {
    queue: VecDeque<QueuedItem>,
    /// Total live workers
    workers: usize,
    /// Workers parked on the queue
    idle: usize,
    shutting_down: bool,
}

struct Shared {
    state: Mutex<PoolState>,
    work_available: Condvar,
    config: PoolConfig,
}

/// Bounded worker pool. Cheap to clone; all clones share the workers.
#[derive(Clone)]
pub struct WorkerPool {
    shared: Arc<Shared>,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Self {
        let pool = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState {
                    queue: VecDeque::new(),
                    workers: 0,
                    idle: 0,
                    shutting_down: false,
                }),
                work_available: Condvar::new(),
                config,
            }),
        };
        for _ in 0..pool.shared.config.min_workers {
            register_worker(&pool.shared);
        }
        pool
    }

    /// Deadline for an item: `5s + 1s per 10 KiB`, capped.
    pub fn timeout_for(&self, payload_bytes: usize) -> Duration {
        let extra = Duration::from_secs((payload_bytes / BYTES_PER_EXTRA_SECOND) as u64);
        (BASE_TIMEOUT + extra).min(self.shared.config.max_task_timeout)
    }

    /// Run one item to completion or deadline.
    pub async fn execute(&self, item: WorkItem) -> Result<String, PoolError> {
        let timeout = self.timeout_for(item.payload_bytes);
        let cancelled = Arc::new(AtomicBool::new(false));
        let (reply_tx, reply_rx) = oneshot::channel();

        {
            let mut state = self.shared.state.lock();
            if state.shutting_down {
                return Err(PoolError::ShuttingDown);
            }
            state.queue.push_back(QueuedItem {
                name: item.name,
                job: item.job,
                reply: reply_tx,
                cancelled: Arc::clone(&cancelled),
            });
            // No idle worker and room to grow: spawn one
            if state.idle == 0 && state.workers < self.shared.config.max_workers {
                spawn_worker(Arc::clone(&self.shared));
                state.workers += 1;
            }
        }
        self.shared.work_available.notify_one();

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(PoolError::WorkerLost),
            Err(_) => {
                // The worker (if any) sees this at its next boundary and
                // retires instead of recycling
                cancelled.store(true, Ordering::SeqCst);
                Err(PoolError::Timeout(timeout))
            }
        }
    }

    /// Current live worker count.
    pub fn worker_count(&self) -> usize {
        self.shared.state.lock().workers
    }

    /// Queued (not yet claimed) item count.
    pub fn queued(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Graceful shutdown: stop intake, wait up to `drain` for the queue
    /// to empty, then reject whatever is left.
    pub async fn shutdown(&self, drain: Duration) {
        {
            let mut state = self.shared.state.lock();
            state.shutting_down = true;
        }
        self.shared.work_available.notify_all();

        let deadline = tokio::time::Instant::now() + drain;
        loop {
            {
                let state = self.shared.state.lock();
                if state.queue.is_empty() {
                    break;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let rejected: Vec<QueuedItem> = {
            let mut state = self.shared.state.lock();
            state.queue.drain(..).collect()
        };
        for item in rejected {
            warn!(item = %item.name, "rejecting queued item at shutdown");
            let _ = item.reply.send(Err(PoolError::ShuttingDown));
        }
        self.shared.work_available.notify_all();
    }
}

/// Spawn a detached worker thread.
///
/// Callers holding the state lock must bump `workers` themselves; the
/// initial `min_workers` spawn and exit-path replacements go through
/// [`register_worker`].
fn spawn_worker(shared: Arc<Shared>) {
    std::thread::spawn(move || worker_loop(shared));
}

fn register_worker(shared: &Arc<Shared>) {
    shared.state.lock().workers += 1;
    spawn_worker(Arc::clone(shared));
}

fn worker_loop(shared: Arc<Shared>) {
    let mut tasks_done = 0usize;

    loop {
        let item = {
            let mut state = shared.state.lock();
            loop {
                if let Some(item) = state.queue.pop_front() {
                    break item;
                }
                if state.shutting_down {
                    state.workers -= 1;
                    return;
                }
                state.idle += 1;
                let timed_out = shared
                    .work_available
                    .wait_for(&mut state, shared.config.idle_timeout)
                    .timed_out();
                state.idle -= 1;

                // Idle release: shrink back toward min_workers
                if timed_out && state.queue.is_empty() && state.workers > shared.config.min_workers
                {
                    state.workers -= 1;
                    debug!(workers = state.workers, "released idle worker");
                    return;
                }
            }
        };

        if item.cancelled.load(Ordering::SeqCst) {
            // Deadline passed while queued; nothing ran, keep the worker
            continue;
        }

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(item.job));
        tasks_done += 1;

        let outcome = match result {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(message)) => Err(PoolError::Failed(message)),
            Err(_) => Err(PoolError::Panicked),
        };
        let panicked = matches!(outcome, Err(PoolError::Panicked));
        let _ = item.reply.send(outcome);

        // A worker that blew a deadline or panicked is retired, not
        // recycled; one that hit its task quota is replaced fresh. An
        // item that merely returned an error keeps its worker.
        let timed_out = item.cancelled.load(Ordering::SeqCst);
        let quota_reached = tasks_done >= shared.config.max_tasks_per_worker;
        if timed_out || panicked || quota_reached {
            let mut state = shared.state.lock();
            state.workers -= 1;
            let needs_replacement = !state.shutting_down
                && (state.workers < shared.config.min_workers
                    || (!state.queue.is_empty() && state.workers < shared.config.max_workers));
            drop(state);
            if timed_out {
                warn!(item = %item.name, "retiring worker after deadline expiry");
            }
            if needs_replacement {
                register_worker(&shared);
            }
            return;
        }
    }
}

// ── Global pool accessor ────────────────────────────────────────────────────

static GLOBAL_POOL: OnceLock<WorkerPool> = OnceLock::new();

/// Install the process-wide pool. May be called exactly once.
///
/// Components take `&WorkerPool` explicitly; the global exists only for
/// composition roots that want a single shared instance.
pub fn init_global_pool(pool: WorkerPool) -> Result<(), PoolError> {
    GLOBAL_POOL
        .set(pool)
        .map_err(|_| PoolError::AlreadyInitialized)
}

/// The process-wide pool, if one was installed.
pub fn global_pool() -> Option<&'static WorkerPool> {
    GLOBAL_POOL.get()
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
