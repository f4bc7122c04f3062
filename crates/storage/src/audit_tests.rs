// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn record(action: &str, ts: u64) -> AuditRecord {
    AuditRecord {
        timestamp: ts,
        actor: "window".to_string(),
        action: action.to_string(),
        details: Metadata::new(),
    }
}

#[test]
fn append_and_read_back_in_order() {
    let dir = tempdir().unwrap();
    let mut log = AuditLog::open(dir.path()).unwrap();

    log.append(&record("filter", 1)).unwrap();
    log.append(&record("archive", 2)).unwrap();

    let records = log.read_all().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].action, "filter");
    assert_eq!(records[1].action, "archive");
}

#[test]
fn malformed_lines_are_skipped() {
    let dir = tempdir().unwrap();
    {
        let mut log = AuditLog::open(dir.path()).unwrap();
        log.append(&record("keep", 1)).unwrap();
    }

    let path = dir.path().join("immutable-logs.jsonl");
    let mut contents = std::fs::read_to_string(&path).unwrap();
    contents.push_str("%%% broken %%%\n");
    std::fs::write(&path, contents).unwrap();

    let mut log = AuditLog::open(dir.path()).unwrap();
    log.append(&record("after", 2)).unwrap();

    let records = log.read_all().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].action, "after");
}

#[test]
fn reopen_appends_to_existing_file() {
    let dir = tempdir().unwrap();
    {
        let mut log = AuditLog::open(dir.path()).unwrap();
        log.append(&record("first", 1)).unwrap();
    }
    let mut log = AuditLog::open(dir.path()).unwrap();
    log.append(&record("second", 2)).unwrap();

    assert_eq!(log.read_all().unwrap().len(), 2);
}
