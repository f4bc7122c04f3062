//! Deterministic escalation specs
//!
//! The S3 scenario: 50 × 1000-char messages, target 200 tokens, no LLM
//! available.

use crate::prelude::*;
use vibe_context::{escalated_summarize, EscalationOptions};

fn fifty_long_messages() -> Vec<Message> {
    (0..50)
        .map(|i| Message::user(format!("{:03} {}", i, "content ".repeat(124))))
        .collect()
}

#[tokio::test]
async fn truncation_is_guaranteed_without_an_llm() {
    let messages = fifty_long_messages();
    let target = 200;

    let outcome = escalated_summarize(&messages, target, EscalationOptions::default())
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.achieved_level, 3);
    assert!(outcome.content.starts_with("# Context Summary (Truncated)"));
    assert!(outcome.content.contains("Original message count: 50"));

    let header_allowance = 120;
    assert!(outcome.content.chars().count() <= target * 4 + header_allowance);
    assert!(outcome.reduction_ratio > 0.9);
}

#[tokio::test]
async fn every_target_down_to_one_token_succeeds() {
    let messages = fifty_long_messages();
    for target in [1, 10, 100, 1_000, 10_000] {
        let outcome = escalated_summarize(&messages, target, EscalationOptions::default())
            .await
            .unwrap();
        assert!(outcome.success, "target {}", target);
        assert!(
            (0..=3).contains(&outcome.achieved_level),
            "target {}",
            target
        );
    }
}

#[tokio::test]
async fn oversize_window_compresses_then_escalates() {
    // Archival and escalation compose: archive the old half, then
    // summarize what remains
    let dir = tempdir().unwrap();
    let archiver = vibe_context::LogArchiver::new(
        vibe_context::ArchivalConfig {
            token_limit: 1_000,
            threshold_percentage: 0.5,
            preserve_recent_messages: 5,
            chunk_size: 10,
        },
        vibe_storage::ArchiveStore::new(dir.path()),
        CountingIdGen::new("ptr"),
        FakeClock::new(),
    );

    let compressed = archiver.compress(fifty_long_messages()).unwrap();
    assert!(compressed.archived_count > 0);
    assert!(compressed.messages.len() < 50);

    let outcome = escalated_summarize(&compressed.messages, 100, EscalationOptions::default())
        .await
        .unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.achieved_level, 3);
}
