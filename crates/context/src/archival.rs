// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Old-log archival: contiguous chunks of stale messages are persisted
//! and replaced in the live window by log pointers.
//!
//! The recent tail (`preserve_recent_messages`) always stays in place.
//! Each archived chunk gets regex-extracted metadata (role counts,
//! timestamps, candidate decisions, file references) and a one-line
//! reasoning string so the pointer reads usefully in the window.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{info, warn};
use vibe_core::{
    estimate_conversation_tokens, Clock, IdGen, LogPointer, LogPointerMetadata, Message, PointerId,
};
use vibe_storage::{ArchiveError, ArchiveStore, ContextArchive};

// Allow expect here as the regexes are compile-time verified to be valid
#[allow(clippy::expect_used)]
static DECISION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:decided|decision|chose|chosen|agreed|settled on|will use|going with)\b")
        .expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static FILE_REF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\w~./-]*[\w-]+\.(?:rs|ts|tsx|js|jsx|py|go|json|toml|yaml|yml|md|txt|sh)\b")
        .expect("constant regex pattern is valid")
});

/// Decision lines kept per archived chunk.
const MAX_DECISIONS: usize = 5;

/// File references kept per archived chunk.
const MAX_FILE_REFS: usize = 10;

/// Archival thresholds.
#[derive(Debug, Clone)]
pub struct ArchivalConfig {
    /// Token budget the live window is measured against
    pub token_limit: usize,
    /// Fraction of `token_limit` that triggers archival
    pub threshold_percentage: f64,
    /// Messages at the tail that are never archived
    pub preserve_recent_messages: usize,
    /// Messages per archived chunk
    pub chunk_size: usize,
}

impl Default for ArchivalConfig {
    fn default() -> Self {
        Self {
            token_limit: 100_000,
            threshold_percentage: 0.8,
            preserve_recent_messages: 10,
            chunk_size: 10,
        }
    }
}

/// Result of an archival pass.
#[derive(Debug, Clone)]
pub struct ArchivalResult {
    /// The new live window: pointers followed by the preserved tail
    pub messages: Vec<Message>,
    pub archived_count: usize,
    pub pointers: Vec<LogPointer>,
    /// Live-window byte reduction achieved by the pass
    pub bytes_saved: u64,
}

/// Old-log compressor.
pub struct LogArchiver<G: IdGen, C: Clock> {
    config: ArchivalConfig,
    archives: ArchiveStore,
    id_gen: G,
    clock: C,
}

impl<G: IdGen, C: Clock> LogArchiver<G, C> {
    pub fn new(config: ArchivalConfig, archives: ArchiveStore, id_gen: G, clock: C) -> Self {
        Self {
            config,
            archives,
            id_gen,
            clock,
        }
    }

    /// Whether the live window has crossed the archival threshold.
    pub fn needs_compression(&self, messages: &[Message]) -> bool {
        let threshold =
            (self.config.token_limit as f64 * self.config.threshold_percentage) as usize;
        estimate_conversation_tokens(messages) > threshold
    }

    /// Archive everything but the recent tail, replacing each chunk with
    /// a pointer message. Returns the input unchanged when below the
    /// threshold or too short to archive.
    pub fn compress(&self, messages: Vec<Message>) -> Result<ArchivalResult, ArchiveError> {
        if !self.needs_compression(&messages)
            || messages.len() <= self.config.preserve_recent_messages
        {
            return Ok(ArchivalResult {
                messages,
                archived_count: 0,
                pointers: Vec::new(),
                bytes_saved: 0,
            });
        }

        let split = messages.len() - self.config.preserve_recent_messages;
        let (head, tail) = messages.split_at(split);

        let mut new_window: Vec<Message> = Vec::new();
        let mut pointers = Vec::new();
        let mut archived_bytes = 0u64;
        let mut pointer_bytes = 0u64;
        let now = self.clock.wall_ms();

        for (chunk_no, chunk) in head.chunks(self.config.chunk_size.max(1)).enumerate() {
            let start_index = chunk_no * self.config.chunk_size.max(1);
            let pointer_id = PointerId::new(self.id_gen.mint());
            let metadata = extract_metadata(chunk, start_index, now);
            let reasoning = render_reasoning(chunk.len(), &metadata);

            let archive = ContextArchive {
                archived_at: now,
                pointer_id: pointer_id.clone(),
                metadata: metadata.clone(),
                messages: chunk.to_vec(),
            };
            let archive_path = self.archives.save_context_archive(&archive)?;

            let pointer = LogPointer {
                pointer_id,
                archive_path,
                original_message_count: chunk.len(),
                compressed_at: now,
                reasoning,
                metadata,
            };

            archived_bytes += chunk.iter().map(|m| m.content().len() as u64).sum::<u64>();
            pointer_bytes += pointer.reasoning.len() as u64;

            new_window.push(Message::Pointer {
                timestamp: pointer.metadata.first_timestamp,
                pointer: pointer.clone(),
            });
            pointers.push(pointer);
        }

        new_window.extend(tail.iter().cloned());

        let archived_count = split;
        info!(
            archived = archived_count,
            pointers = pointers.len(),
            bytes_saved = archived_bytes.saturating_sub(pointer_bytes),
            "archived stale window head",
        );

        Ok(ArchivalResult {
            messages: new_window,
            archived_count,
            pointers,
            bytes_saved: archived_bytes.saturating_sub(pointer_bytes),
        })
    }

    /// Load the messages behind one pointer.
    pub fn expand(&self, pointer: &LogPointer) -> Result<Option<Vec<Message>>, ArchiveError> {
        Ok(self
            .archives
            .load_context_archive(&pointer.pointer_id)?
            .map(|archive| archive.messages))
    }

    /// Reverse an archival pass over a window: every pointer message is
    /// replaced inline by its archived chunk. Pointers whose archive has
    /// gone missing are kept as-is.
    pub fn expand_window(&self, messages: Vec<Message>) -> Result<Vec<Message>, ArchiveError> {
        let mut out = Vec::with_capacity(messages.len());
        for message in messages {
            match &message {
                Message::Pointer { pointer, .. } => match self.expand(pointer)? {
                    Some(archived) => out.extend(archived),
                    None => {
                        warn!(pointer_id = %pointer.pointer_id, "archive missing, keeping pointer");
                        out.push(message);
                    }
                },
                _ => out.push(message),
            }
        }
        Ok(out)
    }
}

/// Extract chunk metadata via the regex heuristics.
///
/// Messages without a timestamp count as "now" at archive time.
fn extract_metadata(chunk: &[Message], start_index: usize, now: u64) -> LogPointerMetadata {
    let mut role_counts: HashMap<String, usize> = HashMap::new();
    let mut decisions = Vec::new();
    let mut file_references: Vec<String> = Vec::new();

    for message in chunk {
        *role_counts.entry(message.role_label().to_string()).or_default() += 1;

        for line in message.content().lines() {
            if decisions.len() < MAX_DECISIONS && DECISION_PATTERN.is_match(line) {
                decisions.push(line.trim().to_string());
            }
        }
        for m in FILE_REF_PATTERN.find_iter(message.content()) {
            let reference = m.as_str().to_string();
            if file_references.len() < MAX_FILE_REFS && !file_references.contains(&reference) {
                file_references.push(reference);
            }
        }
    }

    let timestamps: Vec<u64> = chunk
        .iter()
        .map(|m| m.timestamp().unwrap_or(now))
        .collect();

    LogPointerMetadata {
        start_index,
        end_index: start_index + chunk.len(),
        total_tokens: estimate_conversation_tokens(chunk),
        first_timestamp: timestamps.iter().min().copied(),
        last_timestamp: timestamps.iter().max().copied(),
        role_counts,
        decisions,
        file_references,
    }
}

/// Human-readable one-liner built from the chunk metadata.
fn render_reasoning(count: usize, metadata: &LogPointerMetadata) -> String {
    let mut roles: Vec<(&String, &usize)> = metadata.role_counts.iter().collect();
    roles.sort();
    let roles = roles
        .iter()
        .map(|(role, n)| format!("{} {}", n, role))
        .collect::<Vec<_>>()
        .join(", ");

    let mut reasoning = format!("Archived {} messages ({})", count, roles);
    if !metadata.decisions.is_empty() {
        reasoning.push_str(&format!(", {} decisions noted", metadata.decisions.len()));
    }
    if !metadata.file_references.is_empty() {
        reasoning.push_str(&format!(
            ", touching {} files",
            metadata.file_references.len()
        ));
    }
    reasoning
}

#[cfg(test)]
#[path = "archival_tests.rs"]
mod tests;
