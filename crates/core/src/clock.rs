// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time sources.
//!
//! Components receive their clock at construction. The monotonic reading
//! feeds deadlines, cooldowns, and TTLs; the wall reading feeds persisted
//! timestamps. Tests steer both through [`FakeClock`].

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A pair of time readings the core runs against.
pub trait Clock: Clone + Send + Sync {
    /// Monotonic reading for durations and deadlines.
    fn monotonic(&self) -> Instant;

    /// Wall-clock milliseconds since the Unix epoch.
    fn wall_ms(&self) -> u64;
}

/// The process clock.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn monotonic(&self) -> Instant {
        Instant::now()
    }

    fn wall_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since| since.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Wall reading a fresh [`FakeClock`] starts from.
///
/// A fixed non-zero value, so persisted timestamps in tests are stable
/// and never mistaken for "unset".
const FAKE_WALL_START_MS: u64 = 1_000_000;

struct Readings {
    monotonic: Instant,
    wall_ms: u64,
}

/// Hand-steered clock for tests. Clones observe the same readings.
#[derive(Clone)]
pub struct FakeClock {
    readings: Arc<Mutex<Readings>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            readings: Arc::new(Mutex::new(Readings {
                monotonic: Instant::now(),
                wall_ms: FAKE_WALL_START_MS,
            })),
        }
    }

    /// Move both readings forward by `step`.
    pub fn advance(&self, step: Duration) {
        let mut readings = self.readings.lock();
        readings.monotonic += step;
        readings.wall_ms += step.as_millis() as u64;
    }

    /// Pin the wall reading, leaving the monotonic reading untouched.
    pub fn set_wall_ms(&self, ms: u64) {
        self.readings.lock().wall_ms = ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn monotonic(&self) -> Instant {
        self.readings.lock().monotonic
    }

    fn wall_ms(&self) -> u64 {
        self.readings.lock().wall_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
