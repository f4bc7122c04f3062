// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auxiliary append-only audit log.
//!
//! `immutable-logs.jsonl` follows the same JSONL rules as the transaction
//! log: one record per LF-terminated line, single bounded append per
//! record, malformed lines skipped on read.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use vibe_core::Metadata;

const AUDIT_FILE: &str = "immutable-logs.jsonl";

/// Errors that can occur in audit log operations
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Event timestamp in ms since epoch
    pub timestamp: u64,
    /// Component or caller that produced the record
    pub actor: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub details: Metadata,
}

/// Append-only audit log.
pub struct AuditLog {
    path: PathBuf,
    file: File,
}

impl AuditLog {
    /// Open or create the audit log inside `storage_dir`.
    pub fn open(storage_dir: &Path) -> Result<Self, AuditError> {
        std::fs::create_dir_all(storage_dir)?;
        let path = storage_dir.join(AUDIT_FILE);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single bounded write.
    pub fn append(&mut self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Read all parseable records, skipping malformed lines.
    pub fn read_all(&self) -> Result<Vec<AuditRecord>, AuditError> {
        let mut reader = BufReader::new(self.file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut records = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
                Err(e) => return Err(e.into()),
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "skipping malformed audit line");
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
