//! File-pointer specs
//!
//! The S4 threshold scenario and the byte-identical round trip.

use crate::prelude::*;
use vibe_context::{FilePointerInjector, InjectorConfig};
use vibe_storage::ArchiveStore;

fn injector(root: &std::path::Path) -> FilePointerInjector<CountingIdGen> {
    FilePointerInjector::new(
        InjectorConfig::default(),
        ArchiveStore::new(root),
        CountingIdGen::new("file"),
    )
}

#[test]
fn ten_kilobytes_passes_through() {
    let dir = tempdir().unwrap();
    let content = "x".repeat(10 * 1024);

    let injected = injector(dir.path()).inject(&content, None).unwrap();
    assert!(!injected.was_converted);
    assert_eq!(injected.payload, content);
}

#[test]
fn two_hundred_kilobytes_becomes_a_summary() {
    let dir = tempdir().unwrap();
    let injector = injector(dir.path());
    let content = "export function generated() {}\n".repeat(6_800);
    assert!(content.len() > 200 * 1024);

    let injected = injector.inject(&content, None).unwrap();
    assert!(injected.was_converted);
    assert!(injected.payload.len() < content.len());

    // The original is retrievable byte-for-byte
    let summary = injected.summary.unwrap();
    let restored = injector.load_from_pointer(&summary.archive_path).unwrap();
    assert_eq!(restored, content);
}

#[test]
fn round_trip_preserves_arbitrary_unicode() {
    let dir = tempdir().unwrap();
    let injector = FilePointerInjector::new(
        vibe_context::InjectorConfig {
            soft_limit_tokens: 8,
        },
        ArchiveStore::new(dir.path()),
        CountingIdGen::new("file"),
    );

    let content = "日本語\r\nwindows line\n\ttabs \u{1F980} crab".repeat(4);
    let injected = injector.inject(&content, None).unwrap();
    assert!(injected.was_converted);

    let restored = injector
        .load_from_pointer(&injected.summary.unwrap().archive_path)
        .unwrap();
    assert_eq!(restored, content);
}
