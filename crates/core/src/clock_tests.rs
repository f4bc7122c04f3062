// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_readings_move_forward() {
    let clock = SystemClock;
    let a = clock.monotonic();
    let b = clock.monotonic();
    assert!(b >= a);
    assert!(clock.wall_ms() > FAKE_WALL_START_MS);
}

#[test]
fn fake_clock_starts_at_fixed_wall_reading() {
    assert_eq!(FakeClock::new().wall_ms(), FAKE_WALL_START_MS);
}

#[test]
fn advance_moves_both_readings() {
    let clock = FakeClock::new();
    let monotonic_start = clock.monotonic();
    let wall_start = clock.wall_ms();

    clock.advance(Duration::from_secs(5));

    assert_eq!(clock.monotonic() - monotonic_start, Duration::from_secs(5));
    assert_eq!(clock.wall_ms(), wall_start + 5_000);
}

#[test]
fn set_wall_ms_leaves_monotonic_alone() {
    let clock = FakeClock::new();
    let monotonic_start = clock.monotonic();

    clock.set_wall_ms(42);

    assert_eq!(clock.wall_ms(), 42);
    assert_eq!(clock.monotonic(), monotonic_start);
}

#[test]
fn clones_observe_the_same_readings() {
    let clock = FakeClock::new();
    let observer = clock.clone();

    clock.advance(Duration::from_millis(250));

    assert_eq!(observer.monotonic(), clock.monotonic());
    assert_eq!(observer.wall_ms(), clock.wall_ms());
}
