// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context entries as the active window sees them.

use crate::message::{is_empty_map, Metadata};
use serde::{Deserialize, Serialize};

crate::string_id! {
    /// Unique identifier for a context entry.
    pub struct EntryId;
}

/// Semantic category of a context entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    Bmad,
    Decision,
    Artifact,
    Summary,
    Bash,
    Error,
    Code,
    UserInput,
    File,
}

/// Entry importance. Controls compression victim selection.
///
/// `Critical` entries are never summarized or dropped; lower priorities
/// are compressed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Numeric rank, higher is more important.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 3,
            Self::High => 2,
            Self::Medium => 1,
            Self::Low => 0,
        }
    }

    /// Parse a priority from its case-insensitive name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CRITICAL" => Some(Self::Critical),
            "HIGH" => Some(Self::High),
            "MEDIUM" => Some(Self::Medium),
            "LOW" => Some(Self::Low),
            _ => None,
        }
    }

    /// Whether the compression engine may touch entries at this priority.
    pub fn is_compressible(&self) -> bool {
        !matches!(self, Self::Critical)
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// A categorized, prioritized unit of context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub id: EntryId,
    pub kind: EntryKind,
    pub content: String,
    pub estimated_tokens: usize,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "is_empty_map")]
    pub metadata: Metadata,
    /// Creation timestamp in ms since epoch
    pub created_at: u64,
    /// Last update timestamp in ms since epoch
    pub updated_at: u64,
}

impl ContextEntry {
    pub fn new(
        id: EntryId,
        kind: EntryKind,
        content: impl Into<String>,
        priority: Priority,
        now_ms: u64,
    ) -> Self {
        let content = content.into();
        let estimated_tokens = crate::token::estimate_tokens(&content);
        Self {
            id,
            kind,
            content,
            estimated_tokens,
            priority,
            metadata: Metadata::new(),
            created_at: now_ms,
            updated_at: now_ms,
        }
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
