// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;
use vibe_core::CountingIdGen;

fn injector(root: &Path, soft_limit_tokens: usize) -> FilePointerInjector<CountingIdGen> {
    FilePointerInjector::new(
        InjectorConfig { soft_limit_tokens },
        ArchiveStore::new(root),
        CountingIdGen::new("f"),
    )
}

#[test]
fn small_content_passes_through() {
    let dir = tempdir().unwrap();
    let injector = injector(dir.path(), 20_000);

    // 10 kB is well below the 20k-token soft limit
    let content = "a".repeat(10_000);
    let injected = injector.inject(&content, None).unwrap();

    assert!(!injected.was_converted);
    assert_eq!(injected.payload, content);
    assert!(injected.summary.is_none());
}

#[test]
fn oversize_content_becomes_pointer() {
    let dir = tempdir().unwrap();
    let injector = injector(dir.path(), 20_000);

    // 200 kB of source-ish content crosses the limit
    let content = "fn generated_item() {}\n".repeat(9_000);
    let injected = injector.inject(&content, Some(Path::new("src/gen.rs"))).unwrap();

    assert!(injected.was_converted);
    let summary = injected.summary.unwrap();
    assert_eq!(summary.original_path.as_deref(), Some(Path::new("src/gen.rs")));
    assert_eq!(summary.size_bytes, content.len() as u64);
    assert!(summary.token_count > 20_000);
    assert_eq!(summary.signature.functions, vec!["generated_item"]);

    // The payload is the compact summary, not the content
    assert!(injected.payload.len() < content.len() / 10);
    assert!(injected.payload.contains("src/gen.rs"));
}

#[test]
fn pointer_round_trips_exact_bytes() {
    let dir = tempdir().unwrap();
    let injector = injector(dir.path(), 10);

    let content = "unicode 日本語 and\nnewlines\t".repeat(20);
    let injected = injector.inject(&content, None).unwrap();
    assert!(injected.was_converted);

    let loaded = injector
        .load_from_pointer(&injected.summary.unwrap().archive_path)
        .unwrap();
    assert_eq!(loaded, content);
}

#[test]
fn exactly_at_limit_is_not_converted() {
    let dir = tempdir().unwrap();
    let injector = injector(dir.path(), 25);

    let content = "x".repeat(100); // exactly 25 tokens
    let injected = injector.inject(&content, None).unwrap();
    assert!(!injected.was_converted);
}

#[test]
fn prose_pointer_carries_preview() {
    let dir = tempdir().unwrap();
    let injector = injector(dir.path(), 10);

    let content = "A plain prose paragraph without any code structure. ".repeat(10);
    let injected = injector.inject(&content, None).unwrap();

    let summary = injected.summary.unwrap();
    assert!(summary.signature.is_structureless());
    assert!(!summary.signature.preview.is_empty());
    assert!(injected.payload.contains("Preview:"));
}
