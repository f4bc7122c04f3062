// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owner of the on-disk archive directories.
//!
//! All paths are relative to a project root:
//! - `.vibe-flow/context-archives/archive_<id>.json`: archived message chunks
//! - `.vibe-flow/file-archives/file_<id>.txt`: raw oversize file contents
//! - `.vibe-flow/compressed-archives/log_<id>.json`: escalation archives
//!
//! Writes are atomic (temp-then-rename); reads treat corrupt files as
//! missing. Other components never touch these paths directly.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use vibe_core::{FileId, LogPointerMetadata, Message, PointerId};

const CONTEXT_DIR: &str = ".vibe-flow/context-archives";
const FILE_DIR: &str = ".vibe-flow/file-archives";
const COMPRESSED_DIR: &str = ".vibe-flow/compressed-archives";

/// Errors that can occur in archive operations
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An archived chunk of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextArchive {
    /// Archive timestamp in ms since epoch
    pub archived_at: u64,
    pub pointer_id: PointerId,
    pub metadata: LogPointerMetadata,
    pub messages: Vec<Message>,
}

/// Store for the three archive directories under one project root.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root: PathBuf,
}

impl ArchiveStore {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            root: project_root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final path of a context archive for the given pointer.
    pub fn context_archive_path(&self, pointer_id: &PointerId) -> PathBuf {
        self.root
            .join(CONTEXT_DIR)
            .join(format!("archive_{}.json", pointer_id))
    }

    /// Final path of a file archive for the given file id.
    pub fn file_archive_path(&self, file_id: &FileId) -> PathBuf {
        self.root
            .join(FILE_DIR)
            .join(format!("file_{}.txt", file_id))
    }

    /// Final path of an escalation archive for the given id.
    pub fn compressed_archive_path(&self, log_id: &str) -> PathBuf {
        self.root
            .join(COMPRESSED_DIR)
            .join(format!("log_{}.json", log_id))
    }

    /// Persist an archived message chunk, returning its path.
    pub fn save_context_archive(&self, archive: &ContextArchive) -> Result<PathBuf, ArchiveError> {
        let path = self.context_archive_path(&archive.pointer_id);
        write_json_atomic(&path, archive)?;
        Ok(path)
    }

    /// Load an archived message chunk.
    ///
    /// Returns `Ok(None)` if the archive is missing; a corrupt archive is
    /// reported as missing too, with a warning, so expansion degrades
    /// instead of failing the whole window.
    pub fn load_context_archive(
        &self,
        pointer_id: &PointerId,
    ) -> Result<Option<ContextArchive>, ArchiveError> {
        let path = self.context_archive_path(pointer_id);
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(&path)?;
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(archive) => Ok(Some(archive)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt context archive");
                Ok(None)
            }
        }
    }

    /// List all context archive pointer ids, in directory order.
    pub fn list_context_archives(&self) -> Result<Vec<PointerId>, ArchiveError> {
        let dir = self.root.join(CONTEXT_DIR);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if let Some(id) = name
                .strip_prefix("archive_")
                .and_then(|n| n.strip_suffix(".json"))
            {
                ids.push(PointerId::new(id));
            }
        }
        Ok(ids)
    }

    /// Persist raw oversize content, returning the archive path.
    pub fn save_file_archive(
        &self,
        file_id: &FileId,
        content: &str,
    ) -> Result<PathBuf, ArchiveError> {
        let path = self.file_archive_path(file_id);
        write_bytes_atomic(&path, content.as_bytes())?;
        Ok(path)
    }

    /// Load archived raw content from a pointer's path, byte-identical to
    /// what was stored.
    pub fn load_file_archive(&self, path: &Path) -> Result<String, ArchiveError> {
        Ok(fs::read_to_string(path)?)
    }

    /// Persist an escalation archive, returning its path.
    pub fn save_compressed_archive(
        &self,
        log_id: &str,
        value: &serde_json::Value,
    ) -> Result<PathBuf, ArchiveError> {
        let path = self.compressed_archive_path(log_id);
        write_json_atomic(&path, value)?;
        Ok(path)
    }

    /// Load an escalation archive, `None` when missing or corrupt.
    pub fn load_compressed_archive(
        &self,
        log_id: &str,
    ) -> Result<Option<serde_json::Value>, ArchiveError> {
        let path = self.compressed_archive_path(log_id);
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(&path)?;
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt escalation archive");
                Ok(None)
            }
        }
    }
}

/// Write a JSON value atomically via temp-then-rename.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), ArchiveError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, value)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Write raw bytes atomically via temp-then-rename.
fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<(), ArchiveError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
