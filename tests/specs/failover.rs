//! Router failover specs
//!
//! The S6 scenario: a rate-limited primary falls back silently without
//! counting a breaker failure.

use crate::prelude::*;
use std::time::Duration;
use vibe_adapters::{CircuitState, DriverKind, DriverRouter, FakeDriver, RouterConfig};

fn router(
    primary: &FakeDriver,
    fallback: &FakeDriver,
    threshold: u32,
) -> DriverRouter<FakeDriver, FakeDriver, FakeClock> {
    DriverRouter::new(
        primary.clone(),
        fallback.clone(),
        RouterConfig {
            failure_threshold: threshold,
            cooldown: Duration::from_secs(30),
        },
        FakeClock::new(),
    )
}

#[tokio::test]
async fn rate_limited_primary_uses_fallback_without_counting() {
    let primary = FakeDriver::new();
    let fallback = FakeDriver::new();
    primary.fail_always("t", "429 Too Many Requests");
    fallback.succeed("t", "ok");

    let router = router(&primary, &fallback, 5);
    let result = router.execute_task(&task("t"), &crate::prelude::bare_context("t")).await;

    assert!(result.success);
    assert_eq!(result.driver_used, DriverKind::Fallback);
    assert_eq!(result.output.unwrap().stdout, "ok");
    assert_eq!(router.failure_count(), 0);
    assert_eq!(router.circuit_state(), CircuitState::Closed);
}

#[tokio::test]
async fn breaker_walks_closed_open_half_open_closed() {
    let primary = FakeDriver::new();
    let fallback = FakeDriver::new();
    primary.fail_always("t", "driver crashed");
    fallback.succeed("t", "fallback ok");

    let clock = FakeClock::new();
    let router = DriverRouter::new(
        primary.clone(),
        fallback.clone(),
        RouterConfig {
            failure_threshold: 2,
            cooldown: Duration::from_secs(30),
        },
        clock.clone(),
    );
    let ctx = bare_context("t");

    // Two counted failures open the circuit
    for _ in 0..2 {
        let result = router.execute_task(&task("t"), &ctx).await;
        assert!(!result.success);
    }
    assert_eq!(router.circuit_state(), CircuitState::Open);

    // While open, the primary is never touched
    let primary_calls = primary.calls_for("t");
    let open_result = router.execute_task(&task("t"), &ctx).await;
    assert_eq!(open_result.driver_used, DriverKind::Fallback);
    assert_eq!(primary.calls_for("t"), primary_calls);

    // After the cooldown, one probe; it succeeds and closes the circuit
    primary.succeed("t", "recovered");
    clock.advance(Duration::from_secs(31));
    let probe = router.execute_task(&task("t"), &ctx).await;
    assert!(probe.success);
    assert_eq!(probe.driver_used, DriverKind::Primary);
    assert_eq!(router.circuit_state(), CircuitState::Closed);
}
