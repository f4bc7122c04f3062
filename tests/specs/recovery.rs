//! WAL recovery specs
//!
//! The S2 mixed-frame scenario: corrupted frames are counted and
//! skipped, the newest valid frame wins.

use crate::prelude::*;
use vibe_storage::{StateMap, StateWal};

fn frame(step: i64) -> StateMap {
    let mut map = StateMap::new();
    map.insert("phase".to_string(), serde_json::json!("build"));
    map.insert("step".to_string(), serde_json::json!(step));
    map
}

#[test]
fn mixed_recovery_returns_newest_valid_frame() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let mut wal = StateWal::new(dir.path(), CountingIdGen::new("frame"), clock.clone());

    clock.set_wall_ms(1);
    wal.append(frame(1)).unwrap();
    clock.set_wall_ms(2);
    let middle = wal.append(frame(2)).unwrap();
    clock.set_wall_ms(3);
    wal.append(frame(3)).unwrap();

    // Invalidate the middle frame's checksum
    let path = dir.path().join(&middle);
    let mut raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    raw["checksum"] = serde_json::json!(1);
    std::fs::write(&path, raw.to_string()).unwrap();

    let outcome = wal.recover_last_valid().unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.logs_processed, 2);
    assert_eq!(outcome.corrupted_skipped, 1);
    assert_eq!(outcome.state.unwrap()["step"], 3);
}

#[test]
fn recovery_counts_every_corruption_class() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let mut wal = StateWal::new(dir.path(), CountingIdGen::new("frame"), clock.clone());

    clock.set_wall_ms(10);
    wal.append(frame(1)).unwrap();

    // Parse failure, structure failure, checksum failure
    std::fs::write(dir.path().join("state_20.json"), "{ nope").unwrap();
    std::fs::write(
        dir.path().join("state_30.json"),
        r#"{"id":"","timestamp":30,"data":{},"checksum":0}"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("state_40.json"),
        r#"{"id":"x","timestamp":40,"data":{"step":9},"checksum":123}"#,
    )
    .unwrap();

    let outcome = wal.recover_last_valid().unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.logs_processed, 1);
    assert_eq!(outcome.corrupted_skipped, 3);
    assert_eq!(outcome.state.unwrap()["step"], 1);
}

#[test]
fn prune_then_recover_uses_surviving_frames() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let mut wal = StateWal::new(dir.path(), CountingIdGen::new("frame"), clock.clone());

    for step in 1..=6 {
        clock.set_wall_ms(step * 100);
        wal.append(frame(step as i64)).unwrap();
    }

    assert_eq!(wal.prune(2).unwrap(), 4);
    let outcome = wal.recover_last_valid().unwrap();
    assert_eq!(outcome.logs_processed, 2);
    assert_eq!(outcome.state.unwrap()["step"], 6);
}
