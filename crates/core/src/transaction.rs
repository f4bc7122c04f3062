// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable transaction store entries.

use crate::message::{is_empty_map, Metadata};
use serde::{Deserialize, Serialize};

crate::string_id! {
    /// Unique identifier for a stored transaction (128-bit random).
    pub struct TransactionId;
}

/// The variant of a stored transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    UserPrompt,
    ToolResult,
    AssistantReply,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserPrompt => "user_prompt",
            Self::ToolResult => "tool_result",
            Self::AssistantReply => "assistant_reply",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in the append-only transaction log.
///
/// Once written a transaction is immutable; there is no delete operation
/// anywhere in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Arrival timestamp in ms since epoch; monotone in append order.
    pub timestamp: u64,
    pub kind: TransactionKind,
    pub content: String,
    pub estimated_tokens: usize,
    #[serde(default, skip_serializing_if = "is_empty_map")]
    pub metadata: Metadata,
}

impl Transaction {
    pub fn new(
        id: TransactionId,
        timestamp: u64,
        kind: TransactionKind,
        content: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        let content = content.into();
        let estimated_tokens = crate::token::estimate_tokens(&content);
        Self {
            id,
            timestamp,
            kind,
            content,
            estimated_tokens,
            metadata,
        }
    }
}

#[cfg(test)]
#[path = "transaction_tests.rs"]
mod tests;
