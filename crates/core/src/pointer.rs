// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pointer records that replace blocks of raw data in the live window.
//!
//! A pointer is always de-referenceable: the original bytes live under an
//! archive path owned by the storage layer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

crate::string_id! {
    /// Identifier for an archived log chunk.
    pub struct PointerId;
}

crate::string_id! {
    /// Identifier for an archived oversize file.
    pub struct FileId;
}

/// Static signature extracted from source-like content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSignature {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    /// Truncated head of the content, used when no structure was found
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub preview: String,
}

impl FileSignature {
    /// True when no structural elements were extracted.
    pub fn is_structureless(&self) -> bool {
        self.imports.is_empty()
            && self.exports.is_empty()
            && self.functions.is_empty()
            && self.classes.is_empty()
            && self.interfaces.is_empty()
            && self.types.is_empty()
    }
}

/// Compact record replacing oversize inbound content in a payload.
///
/// Loading the archive path resurfaces the original bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorationSummary {
    pub file_id: FileId,
    /// Path the content originally came from, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_path: Option<PathBuf>,
    /// Where the full bytes were archived
    pub archive_path: PathBuf,
    pub size_bytes: u64,
    pub token_count: usize,
    pub signature: FileSignature,
}

impl ExplorationSummary {
    /// Render the summary as the payload text that replaces the content.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("[File archived: ");
        match &self.original_path {
            Some(p) => out.push_str(&p.display().to_string()),
            None => out.push_str(self.file_id.as_str()),
        }
        out.push_str(&format!(
            " ({} bytes, ~{} tokens)]\n",
            self.size_bytes, self.token_count
        ));

        let mut section = |label: &str, items: &[String]| {
            if !items.is_empty() {
                out.push_str(&format!("{}: {}\n", label, items.join(", ")));
            }
        };
        section("Imports", &self.signature.imports);
        section("Exports", &self.signature.exports);
        section("Functions", &self.signature.functions);
        section("Classes", &self.signature.classes);
        section("Interfaces", &self.signature.interfaces);
        section("Types", &self.signature.types);

        if self.signature.is_structureless() && !self.signature.preview.is_empty() {
            out.push_str("Preview:\n");
            out.push_str(&self.signature.preview);
            out.push('\n');
        }
        out.push_str(&format!("Full content at: {}", self.archive_path.display()));
        out
    }
}

/// Extracted metadata about an archived chunk of messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogPointerMetadata {
    /// Index of the first archived message in the original sequence
    pub start_index: usize,
    /// Index one past the last archived message
    pub end_index: usize,
    pub total_tokens: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_timestamp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<u64>,
    /// Per-role message counts for the archived chunk
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub role_counts: HashMap<String, usize>,
    /// Decision-like lines spotted in the chunk
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decisions: Vec<String>,
    /// File paths referenced by the chunk
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_references: Vec<String>,
}

/// Stand-in for a contiguous chunk of archived messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPointer {
    pub pointer_id: PointerId,
    pub archive_path: PathBuf,
    pub original_message_count: usize,
    /// Archive timestamp in ms since epoch
    pub compressed_at: u64,
    /// Human-readable one-liner describing what was archived
    pub reasoning: String,
    pub metadata: LogPointerMetadata,
}

#[cfg(test)]
#[path = "pointer_tests.rs"]
mod tests;
