// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Large-content to exploration-summary substitution.
//!
//! Inbound content above the soft token limit is persisted under the
//! file-archive directory and replaced in the payload by a compact
//! summary carrying a static signature. Content below the limit passes
//! through untouched.

use crate::analyzer::FileAnalyzer;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use vibe_core::{estimate_tokens, ExplorationSummary, FileId, IdGen};
use vibe_storage::{ArchiveError, ArchiveStore};

/// Errors that can occur while injecting or resolving file pointers
#[derive(Debug, Error)]
pub enum InjectError {
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
}

/// Injector thresholds.
#[derive(Debug, Clone)]
pub struct InjectorConfig {
    /// Token count above which content is converted to a pointer
    pub soft_limit_tokens: usize,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            soft_limit_tokens: 20_000,
        }
    }
}

/// Result of passing content through the injector.
#[derive(Debug, Clone, PartialEq)]
pub struct Injected {
    /// What the live payload carries: the original content, or the
    /// rendered summary when converted
    pub payload: String,
    pub was_converted: bool,
    /// The pointer record, present iff converted
    pub summary: Option<ExplorationSummary>,
}

/// File-pointer injector.
pub struct FilePointerInjector<G: IdGen> {
    config: InjectorConfig,
    archives: ArchiveStore,
    analyzer: FileAnalyzer,
    id_gen: G,
}

impl<G: IdGen> FilePointerInjector<G> {
    pub fn new(config: InjectorConfig, archives: ArchiveStore, id_gen: G) -> Self {
        Self {
            config,
            archives,
            analyzer: FileAnalyzer::default(),
            id_gen,
        }
    }

    /// Replace the analyzer's rule table (e.g. for project-specific rules).
    pub fn with_analyzer(mut self, analyzer: FileAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Pass content through, converting to a pointer when oversize.
    pub fn inject(&self, content: &str, origin: Option<&Path>) -> Result<Injected, InjectError> {
        let token_count = estimate_tokens(content);
        if token_count <= self.config.soft_limit_tokens {
            return Ok(Injected {
                payload: content.to_string(),
                was_converted: false,
                summary: None,
            });
        }

        let file_id = FileId::new(self.id_gen.mint());
        let archive_path = self.archives.save_file_archive(&file_id, content)?;
        let signature = self.analyzer.analyze(content);

        let summary = ExplorationSummary {
            file_id: file_id.clone(),
            original_path: origin.map(Path::to_path_buf),
            archive_path,
            size_bytes: content.len() as u64,
            token_count,
            signature,
        };

        info!(
            file_id = %file_id,
            tokens = token_count,
            bytes = content.len(),
            "archived oversize content behind pointer",
        );

        Ok(Injected {
            payload: summary.render(),
            was_converted: true,
            summary: Some(summary),
        })
    }

    /// Resurface the original bytes behind a pointer path.
    pub fn load_from_pointer(&self, path: &PathBuf) -> Result<String, InjectError> {
        Ok(self.archives.load_file_archive(path)?)
    }
}

#[cfg(test)]
#[path = "injector_tests.rs"]
mod tests;
