// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL transaction store with an on-disk secondary index.
//!
//! Every user input, tool result, and assistant reply lands here exactly
//! once. Each entry is a single line of JSON in `transactions.jsonl`; a
//! sibling `index.json` maps ids to physical line numbers and is rewritten
//! atomically (temp-then-rename) after every append.
//!
//! The invariant `index ⊆ log` must hold across crashes: the index is
//! only trusted when its line count and last id agree with the log, and is
//! rebuilt by scanning otherwise. Malformed log lines are skipped, never
//! fatal.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use vibe_core::{Clock, IdGen, Metadata, Transaction, TransactionId, TransactionKind};

const LOG_FILE: &str = "transactions.jsonl";
const INDEX_FILE: &str = "index.json";

/// Errors that can occur in transaction store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result of a successful append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appended {
    pub id: TransactionId,
    /// Byte offset of the new line within the log file
    pub byte_offset: u64,
    /// Zero-based physical line number of the new entry
    pub line_number: usize,
}

/// Filter for `search`.
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub kind: Option<TransactionKind>,
    pub start_ts: Option<u64>,
    pub end_ts: Option<u64>,
    /// Maximum entries returned; `None` means unlimited
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Page of search results.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub transactions: Vec<Transaction>,
    /// Total matches before pagination
    pub total: usize,
    pub has_more: bool,
}

/// Aggregate store statistics.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total_transactions: usize,
    pub by_kind: HashMap<TransactionKind, usize>,
    pub oldest_timestamp: Option<u64>,
    pub newest_timestamp: Option<u64>,
    pub file_size_bytes: u64,
}

/// One row of the on-disk index.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    id: TransactionId,
    /// Zero-based physical line number in the log
    line: usize,
    kind: TransactionKind,
    timestamp: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    entries: Vec<IndexEntry>,
}

/// Result of a full log scan.
#[derive(Debug, Default)]
struct LogScan {
    entries: Vec<IndexEntry>,
    /// Count of complete (newline-terminated) physical lines
    complete_lines: usize,
    /// Byte length up to and including the last complete line
    valid_len: u64,
}

/// The index is trusted when its row count and last id agree with the log.
fn index_matches(index: &[IndexEntry], log: &[IndexEntry]) -> bool {
    if index.len() != log.len() {
        return false;
    }
    match (index.last(), log.last()) {
        (Some(a), Some(b)) => a.id == b.id,
        (None, None) => true,
        _ => false,
    }
}

/// Append-only transaction store.
///
/// Single-writer: callers needing concurrent producers wrap the store in
/// their own mutex. Readers may observe the log concurrently; a bounded
/// per-line append is issued as one write so partial lines are never
/// observable.
pub struct TransactionStore<G: IdGen, C: Clock> {
    dir: PathBuf,
    log_path: PathBuf,
    index_path: PathBuf,
    file: File,
    /// Current log length in bytes; next append's byte offset
    file_len: u64,
    entries: Vec<IndexEntry>,
    by_id: HashMap<TransactionId, usize>,
    /// Physical line number the next append lands on
    next_line: usize,
    /// Highest timestamp handed out; keeps arrival order monotone
    last_ts: u64,
    id_gen: G,
    clock: C,
}

impl<G: IdGen, C: Clock> TransactionStore<G, C> {
    /// Open or create a store rooted at `storage_dir`.
    ///
    /// Verifies the on-disk index against the log and rebuilds it by
    /// scanning when they disagree.
    pub fn open(storage_dir: &Path, id_gen: G, clock: C) -> Result<Self, StoreError> {
        fs::create_dir_all(storage_dir)?;
        let log_path = storage_dir.join(LOG_FILE);
        let index_path = storage_dir.join(INDEX_FILE);

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&log_path)?;
        let file_len = file.metadata()?.len();

        let mut store = Self {
            dir: storage_dir.to_owned(),
            log_path,
            index_path,
            file,
            file_len,
            entries: Vec::new(),
            by_id: HashMap::new(),
            next_line: 0,
            last_ts: 0,
            id_gen,
            clock,
        };

        let scan = store.scan_log()?;

        // A torn tail (append cut short by a crash) was never durable;
        // drop it so the next append starts on a fresh line.
        if scan.valid_len < store.file_len {
            warn!(
                path = %store.log_path.display(),
                torn_bytes = store.file_len - scan.valid_len,
                "truncating partial tail after crash",
            );
            store.file.set_len(scan.valid_len)?;
            store.file.sync_all()?;
            store.file_len = scan.valid_len;
        }
        store.next_line = scan.complete_lines;

        store.entries = match store.load_index()? {
            Some(entries) if index_matches(&entries, &scan.entries) => entries,
            Some(_) => {
                warn!(path = %store.log_path.display(), "index disagrees with log, rebuilding");
                store.persist_index(&scan.entries)?;
                scan.entries
            }
            None => {
                if !scan.entries.is_empty() {
                    store.persist_index(&scan.entries)?;
                }
                scan.entries
            }
        };

        store.by_id = store
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
        store.last_ts = store.entries.last().map(|e| e.timestamp).unwrap_or(0);

        Ok(store)
    }

    /// Directory this store lives in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append a transaction to the log.
    ///
    /// The JSONL line is buffered whole and issued as a single write, so a
    /// concurrent reader sees the new line in full or not at all. The
    /// index is rewritten durably (temp-then-rename) before returning.
    pub fn append(
        &mut self,
        kind: TransactionKind,
        content: impl Into<String>,
        metadata: Metadata,
    ) -> Result<Appended, StoreError> {
        // Arrival timestamps are monotone even if the wall clock steps back
        let ts = self.clock.wall_ms().max(self.last_ts);
        let tx = Transaction::new(
            TransactionId::new(self.id_gen.mint()),
            ts,
            kind,
            content,
            metadata,
        );

        let mut line = serde_json::to_vec(&tx)?;
        line.push(b'\n');

        let byte_offset = self.file_len;
        self.file.write_all(&line)?;
        self.file.sync_all()?;
        self.file_len += line.len() as u64;
        self.last_ts = ts;

        let line_number = self.next_line;
        self.next_line += 1;
        self.entries.push(IndexEntry {
            id: tx.id.clone(),
            line: line_number,
            kind,
            timestamp: ts,
        });
        self.by_id.insert(tx.id.clone(), self.entries.len() - 1);

        self.persist_index(&self.entries)?;

        Ok(Appended {
            id: tx.id,
            byte_offset,
            line_number,
        })
    }

    /// Search the store, filtering over index rows and seeking into the
    /// log only for matching lines.
    pub fn search(&self, query: &TransactionQuery) -> Result<SearchResults, StoreError> {
        let matches: Vec<&IndexEntry> = self
            .entries
            .iter()
            .filter(|e| {
                query.kind.is_none_or(|k| e.kind == k)
                    && query.start_ts.is_none_or(|ts| e.timestamp >= ts)
                    && query.end_ts.is_none_or(|ts| e.timestamp <= ts)
            })
            .collect();

        let total = matches.len();
        let page: Vec<&IndexEntry> = matches
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();
        let has_more = query.offset + page.len() < total;

        let wanted: BTreeSet<usize> = page.iter().map(|e| e.line).collect();
        let mut by_line = self.read_lines(&wanted)?;

        let transactions = page
            .iter()
            .filter_map(|e| by_line.remove(&e.line))
            .collect();

        Ok(SearchResults {
            transactions,
            total,
            has_more,
        })
    }

    /// Fetch a transaction by id, or `None` if unknown.
    pub fn get_by_id(&self, id: &TransactionId) -> Result<Option<Transaction>, StoreError> {
        let Some(&pos) = self.by_id.get(id) else {
            return Ok(None);
        };
        let line = self.entries[pos].line;
        let mut found = self.read_lines(&BTreeSet::from([line]))?;
        Ok(found.remove(&line))
    }

    /// Aggregate statistics over the store.
    pub fn stats(&self) -> StoreStats {
        let mut by_kind: HashMap<TransactionKind, usize> = HashMap::new();
        for entry in &self.entries {
            *by_kind.entry(entry.kind).or_default() += 1;
        }
        StoreStats {
            total_transactions: self.entries.len(),
            by_kind,
            oldest_timestamp: self.entries.first().map(|e| e.timestamp),
            newest_timestamp: self.entries.last().map(|e| e.timestamp),
            file_size_bytes: self.file_len,
        }
    }

    /// Read the transactions at the given physical line numbers.
    ///
    /// Lines that fail to parse are skipped with a warning; a complete
    /// index row whose log line has rotted is a data problem to surface,
    /// not a crash.
    fn read_lines(
        &self,
        wanted: &BTreeSet<usize>,
    ) -> Result<HashMap<usize, Transaction>, StoreError> {
        let mut out = HashMap::new();
        if wanted.is_empty() {
            return Ok(out);
        }

        let mut reader = BufReader::new(self.file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut line = String::new();
        let mut line_no = 0usize;
        let last = *wanted.iter().next_back().unwrap_or(&0);

        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
                Err(e) => return Err(e.into()),
            }

            if wanted.contains(&line_no) {
                match serde_json::from_str::<Transaction>(line.trim()) {
                    Ok(tx) => {
                        out.insert(line_no, tx);
                    }
                    Err(e) => {
                        warn!(line = line_no, error = %e, "unparsable log line, skipping");
                    }
                }
            }

            if line_no >= last {
                break;
            }
            line_no += 1;
        }

        Ok(out)
    }

    /// Rebuild index rows by scanning the whole log.
    ///
    /// Malformed lines are skipped (with a warning) but still consume a
    /// physical line number. A final line without a newline is a torn
    /// append and is excluded from `valid_len`.
    fn scan_log(&self) -> Result<LogScan, StoreError> {
        let mut reader = BufReader::new(self.file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut scan = LogScan::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
                Err(e) => return Err(e.into()),
            }

            if buf.last() != Some(&b'\n') {
                break;
            }

            match serde_json::from_slice::<Transaction>(&buf) {
                Ok(tx) => scan.entries.push(IndexEntry {
                    id: tx.id,
                    line: scan.complete_lines,
                    kind: tx.kind,
                    timestamp: tx.timestamp,
                }),
                Err(e) => {
                    warn!(line = scan.complete_lines, error = %e, "skipping malformed log line");
                }
            }

            scan.complete_lines += 1;
            scan.valid_len += buf.len() as u64;
        }

        Ok(scan)
    }

    fn load_index(&self) -> Result<Option<Vec<IndexEntry>>, StoreError> {
        if !self.index_path.exists() {
            return Ok(None);
        }
        let file = File::open(&self.index_path)?;
        match serde_json::from_reader::<_, IndexFile>(BufReader::new(file)) {
            Ok(index) => Ok(Some(index.entries)),
            Err(e) => {
                warn!(path = %self.index_path.display(), error = %e, "corrupt index, will rebuild");
                Ok(None)
            }
        }
    }

    /// Durably rewrite the index via temp-then-rename.
    fn persist_index(&self, entries: &[IndexEntry]) -> Result<(), StoreError> {
        let tmp_path = self.index_path.with_extension("json.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = io::BufWriter::new(file);
            serde_json::to_writer(
                &mut writer,
                &IndexFile {
                    entries: entries.to_vec(),
                },
            )?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.index_path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "transactions_tests.rs"]
mod tests;
