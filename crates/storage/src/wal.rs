// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checksummed state frames for crash recovery.
//!
//! Each frame is its own file `state_<ts>.json` holding `{id, timestamp,
//! data, checksum}`, where the checksum is a crc32 over a canonicalised
//! (sorted-key, compact) JSON form of `data`. One file per frame keeps
//! recovery tolerant to a mid-write crash of any single frame and makes
//! pruning trivial.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use vibe_core::{Clock, IdGen};

const FRAME_PREFIX: &str = "state_";
const FRAME_SUFFIX: &str = ".json";

/// Errors that can occur in state WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Opaque key-value state captured by a frame.
pub type StateMap = serde_json::Map<String, serde_json::Value>;

/// A single persisted state frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFrame {
    pub id: String,
    /// Capture timestamp in ms since epoch
    pub timestamp: u64,
    pub data: StateMap,
    pub checksum: u32,
}

impl StateFrame {
    /// Recompute the checksum and compare against the stored one.
    pub fn verify(&self) -> bool {
        frame_checksum(&self.data) == self.checksum
    }
}

/// Outcome of `recover_last_valid`.
#[derive(Debug, Clone, Default)]
pub struct RecoveryOutcome {
    pub success: bool,
    /// The most recent valid frame's data
    pub state: Option<StateMap>,
    /// Count of frames that parsed and verified
    pub logs_processed: usize,
    /// Count of frames rejected for parse, structure, or checksum failure
    pub corrupted_skipped: usize,
}

/// Diagnostic listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    pub file_name: String,
    pub timestamp: u64,
    pub size_bytes: u64,
}

/// Frame-per-file write-ahead state store.
pub struct StateWal<G: IdGen, C: Clock> {
    dir: PathBuf,
    id_gen: G,
    clock: C,
    /// Timestamp of the last frame written; disambiguates same-ms appends
    last_ts: u64,
}

impl<G: IdGen, C: Clock> StateWal<G, C> {
    pub fn new(dir: impl Into<PathBuf>, id_gen: G, clock: C) -> Self {
        Self {
            dir: dir.into(),
            id_gen,
            clock,
            last_ts: 0,
        }
    }

    /// Persist a state frame, returning the created file name.
    ///
    /// The frame is written to a temp file and renamed into place so a
    /// crash never leaves a half-written frame under its final name.
    pub fn append(&mut self, data: StateMap) -> Result<String, WalError> {
        fs::create_dir_all(&self.dir)?;

        // Same-ms appends get distinct file names
        let ts = self.clock.wall_ms().max(self.last_ts + 1);
        self.last_ts = ts;

        let frame = StateFrame {
            id: self.id_gen.mint(),
            timestamp: ts,
            checksum: frame_checksum(&data),
            data,
        };

        let file_name = format!("{}{}{}", FRAME_PREFIX, ts, FRAME_SUFFIX);
        let path = self.dir.join(&file_name);
        let tmp_path = path.with_extension("json.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, &frame)?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        Ok(file_name)
    }

    /// Recover the most recent valid frame.
    ///
    /// Frames that fail JSON parse, structure checks, or checksum
    /// verification are counted as corrupted and skipped; corruption is
    /// never fatal. A missing WAL directory yields an empty outcome.
    pub fn recover_last_valid(&self) -> Result<RecoveryOutcome, WalError> {
        let mut outcome = RecoveryOutcome::default();

        let frames = match self.frame_files() {
            Ok(frames) => frames,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(outcome),
            Err(e) => return Err(e.into()),
        };

        for (path, _ts) in frames {
            match read_frame(&path) {
                Ok(frame) => {
                    outcome.logs_processed += 1;
                    // Ascending timestamp order: the last valid frame wins
                    outcome.state = Some(frame.data);
                }
                Err(reason) => {
                    warn!(path = %path.display(), reason, "skipping corrupt state frame");
                    outcome.corrupted_skipped += 1;
                }
            }
        }

        outcome.success = outcome.state.is_some();
        Ok(outcome)
    }

    /// Remove all but the newest `keep` frames, returning the removed count.
    pub fn prune(&self, keep: usize) -> Result<usize, WalError> {
        let frames = match self.frame_files() {
            Ok(frames) => frames,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let total = frames.len();
        let mut removed = 0;
        if total > keep {
            for (path, _) in &frames[..total - keep] {
                fs::remove_file(path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// List frame files for diagnostics, oldest first.
    pub fn list(&self) -> Result<Vec<FrameInfo>, WalError> {
        let frames = match self.frame_files() {
            Ok(frames) => frames,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        frames
            .into_iter()
            .map(|(path, ts)| {
                let size_bytes = fs::metadata(&path)?.len();
                Ok(FrameInfo {
                    file_name: path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    timestamp: ts,
                    size_bytes,
                })
            })
            .collect()
    }

    /// Frame paths with their name-encoded timestamps, ascending.
    fn frame_files(&self) -> io::Result<Vec<(PathBuf, u64)>> {
        let mut frames = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(ts) = parse_frame_timestamp(&name) else {
                continue;
            };
            frames.push((entry.path(), ts));
        }
        frames.sort_by_key(|(_, ts)| *ts);
        Ok(frames)
    }
}

/// Extract the timestamp from a `state_<ts>.json` file name.
fn parse_frame_timestamp(name: &str) -> Option<u64> {
    name.strip_prefix(FRAME_PREFIX)?
        .strip_suffix(FRAME_SUFFIX)?
        .parse()
        .ok()
}

/// Read and fully validate one frame, describing the failure on rejection.
fn read_frame(path: &Path) -> Result<StateFrame, &'static str> {
    let file = File::open(path).map_err(|_| "unreadable")?;
    let frame: StateFrame =
        serde_json::from_reader(BufReader::new(file)).map_err(|_| "json parse failed")?;
    if frame.id.is_empty() || frame.timestamp == 0 {
        return Err("invalid structure");
    }
    if !frame.verify() {
        return Err("checksum mismatch");
    }
    Ok(frame)
}

/// crc32 over the canonicalised JSON form of the frame data.
pub(crate) fn frame_checksum(data: &StateMap) -> u32 {
    crc32fast::hash(canonical_json(&serde_json::Value::Object(data.clone())).as_bytes())
}

/// Deterministic JSON rendering: object keys sorted recursively, compact
/// separators. Checksums must not depend on map iteration order.
fn canonical_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let sorted: BTreeMap<&String, String> = map
                .iter()
                .map(|(k, v)| (k, canonical_json(v)))
                .collect();
            let body: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{}:{}", serde_json::Value::String(k.clone()), v))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        serde_json::Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
