// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only tool surface over the archives.
//!
//! Upstream layers query archived context through exactly three
//! operations: `describe`, `expand`, and `grep`. All three are pure reads
//! and return structured records.

use regex::RegexBuilder;
use thiserror::Error;
use vibe_core::{LogPointerMetadata, Message, PointerId};
use vibe_storage::{ArchiveError, ArchiveStore};

/// Errors from the tool surface
#[derive(Debug, Error)]
pub enum ToolsError {
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Structured answer to `describe`.
#[derive(Debug, Clone, PartialEq)]
pub struct DescribeResult {
    pub pointer_id: PointerId,
    pub archived_at: u64,
    pub message_count: usize,
    pub metadata: LogPointerMetadata,
}

/// Options for `grep`.
#[derive(Debug, Clone)]
pub struct GrepOptions {
    pub case_sensitive: bool,
    pub max_results: usize,
    /// Include the full matching message content in each match
    pub include_content: bool,
}

impl Default for GrepOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            max_results: 50,
            include_content: false,
        }
    }
}

/// One grep hit.
#[derive(Debug, Clone, PartialEq)]
pub struct GrepMatch {
    pub pointer_id: PointerId,
    /// Index of the matching message within its archive
    pub message_index: usize,
    /// The matching line
    pub line: String,
    /// Full message content, present iff requested
    pub content: Option<String>,
}

/// Pure-read views over the archive store.
pub struct ArchiveTools {
    archives: ArchiveStore,
}

impl ArchiveTools {
    pub fn new(archives: ArchiveStore) -> Self {
        Self { archives }
    }

    /// Describe one archived chunk, or `None` if unknown.
    pub fn describe(&self, id: &str) -> Result<Option<DescribeResult>, ToolsError> {
        let pointer_id = PointerId::new(id);
        Ok(self
            .archives
            .load_context_archive(&pointer_id)?
            .map(|archive| DescribeResult {
                pointer_id,
                archived_at: archive.archived_at,
                message_count: archive.messages.len(),
                metadata: archive.metadata,
            }))
    }

    /// Load the messages behind one pointer id, or `None` if unknown.
    pub fn expand(&self, pointer_id: &str) -> Result<Option<Vec<Message>>, ToolsError> {
        Ok(self
            .archives
            .load_context_archive(&PointerId::new(pointer_id))?
            .map(|archive| archive.messages))
    }

    /// Search all archived message contents for a pattern.
    pub fn grep(&self, pattern: &str, options: &GrepOptions) -> Result<Vec<GrepMatch>, ToolsError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(!options.case_sensitive)
            .build()?;

        let mut matches = Vec::new();
        'outer: for pointer_id in self.archives.list_context_archives()? {
            let Some(archive) = self.archives.load_context_archive(&pointer_id)? else {
                continue;
            };

            for (message_index, message) in archive.messages.iter().enumerate() {
                for line in message.content().lines() {
                    if !regex.is_match(line) {
                        continue;
                    }
                    matches.push(GrepMatch {
                        pointer_id: pointer_id.clone(),
                        message_index,
                        line: line.to_string(),
                        content: options
                            .include_content
                            .then(|| message.content().to_string()),
                    });
                    if matches.len() >= options.max_results {
                        break 'outer;
                    }
                    break; // one hit per message
                }
            }
        }
        Ok(matches)
    }
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
