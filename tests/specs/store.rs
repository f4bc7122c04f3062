//! Transaction store specs
//!
//! Durability and ordering of the append-only log, including the S1
//! append/search scenario.

use crate::prelude::*;
use vibe_storage::{TransactionQuery, TransactionStore};
use vibe_core::TransactionKind;

#[test]
fn append_then_search_by_variant() {
    let dir = tempdir().unwrap();
    let mut store =
        TransactionStore::open(dir.path(), CountingIdGen::new("tx"), FakeClock::new()).unwrap();

    store
        .append(TransactionKind::UserPrompt, "hello", Metadata::new())
        .unwrap();
    store
        .append(TransactionKind::ToolResult, "ok", Metadata::new())
        .unwrap();

    let results = store
        .search(&TransactionQuery {
            kind: Some(TransactionKind::ToolResult),
            ..TransactionQuery::default()
        })
        .unwrap();
    assert_eq!(results.transactions[0].content, "ok");
    assert_eq!(store.stats().total_transactions, 2);
}

#[test]
fn unfiltered_search_returns_appends_in_order_with_distinct_ids() {
    let dir = tempdir().unwrap();
    let mut store =
        TransactionStore::open(dir.path(), CountingIdGen::new("tx"), FakeClock::new()).unwrap();

    let mut appended = Vec::new();
    for i in 0..25 {
        appended.push(
            store
                .append(TransactionKind::UserPrompt, format!("entry {}", i), Metadata::new())
                .unwrap(),
        );
    }

    let results = store.search(&TransactionQuery::default()).unwrap();
    assert_eq!(results.total, 25);
    for (i, tx) in results.transactions.iter().enumerate() {
        assert_eq!(tx.content, format!("entry {}", i));
        assert_eq!(tx.id, appended[i].id);
    }

    for (i, tx) in appended.iter().enumerate() {
        let found = store.get_by_id(&tx.id).unwrap().unwrap();
        assert_eq!(found.content, format!("entry {}", i));
    }
}

#[test]
fn survives_truncation_at_arbitrary_byte_offsets() {
    let dir = tempdir().unwrap();
    {
        let mut store =
            TransactionStore::open(dir.path(), CountingIdGen::new("tx"), FakeClock::new())
                .unwrap();
        for i in 0..10 {
            store
                .append(TransactionKind::ToolResult, format!("result {}", i), Metadata::new())
                .unwrap();
        }
    }

    let log = dir.path().join("transactions.jsonl");
    let bytes = std::fs::read(&log).unwrap();

    for cut in [bytes.len() - 1, bytes.len() / 2, bytes.len() / 3, 1] {
        std::fs::write(&log, &bytes[..cut]).unwrap();
        let _ = std::fs::remove_file(dir.path().join("index.json"));

        let complete_lines = bytes[..cut].iter().filter(|&&b| b == b'\n').count();
        let store =
            TransactionStore::open(dir.path(), CountingIdGen::new("re"), FakeClock::new())
                .unwrap();
        assert_eq!(store.stats().total_transactions, complete_lines);
    }
}
