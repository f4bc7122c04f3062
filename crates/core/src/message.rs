// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversation message types.
//!
//! A [`Message`] is the unit the active window filters and the
//! compression engine archives. Serializes with `{"type": "...",
//! ...fields}` format so payloads round-trip through JSON untouched.

use crate::entry::Priority;
use crate::pointer::LogPointer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Open-ended metadata mapping carried by messages and transactions.
pub type Metadata = HashMap<String, serde_json::Value>;

pub(crate) fn is_empty_map<K, V>(map: &HashMap<K, V>) -> bool {
    map.is_empty()
}

/// A single message in the live conversation window.
///
/// `Pointer` stands in for a contiguous run of archived messages; its
/// visible content is the pointer's one-line reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "user_prompt")]
    UserPrompt {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
        #[serde(default, skip_serializing_if = "is_empty_map")]
        metadata: Metadata,
    },

    #[serde(rename = "tool_result")]
    ToolResult {
        content: String,
        /// Name of the tool that produced this result
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
        #[serde(default, skip_serializing_if = "is_empty_map")]
        metadata: Metadata,
    },

    #[serde(rename = "assistant_reply")]
    AssistantReply {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
        #[serde(default, skip_serializing_if = "is_empty_map")]
        metadata: Metadata,
    },

    #[serde(rename = "system")]
    System {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
        #[serde(default, skip_serializing_if = "is_empty_map")]
        metadata: Metadata,
    },

    /// Assistant reasoning block. Stripped from historical turns by the
    /// active window; only the current turn keeps its thoughts.
    #[serde(rename = "thought")]
    Thought {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
        #[serde(default, skip_serializing_if = "is_empty_map")]
        metadata: Metadata,
    },

    /// Compact stand-in for an archived chunk of the conversation.
    #[serde(rename = "pointer")]
    Pointer {
        pointer: LogPointer,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },
}

impl Message {
    /// Build a user prompt with no timestamp or metadata.
    pub fn user(content: impl Into<String>) -> Self {
        Self::UserPrompt {
            content: content.into(),
            timestamp: None,
            metadata: Metadata::new(),
        }
    }

    /// Build a tool result with no timestamp or metadata.
    pub fn tool(content: impl Into<String>) -> Self {
        Self::ToolResult {
            content: content.into(),
            tool_name: None,
            timestamp: None,
            metadata: Metadata::new(),
        }
    }

    /// Build an assistant reply with no timestamp or metadata.
    pub fn reply(content: impl Into<String>) -> Self {
        Self::AssistantReply {
            content: content.into(),
            timestamp: None,
            metadata: Metadata::new(),
        }
    }

    /// Build a system message with no timestamp or metadata.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
            timestamp: None,
            metadata: Metadata::new(),
        }
    }

    /// Build a thought block with no timestamp or metadata.
    pub fn thought(content: impl Into<String>) -> Self {
        Self::Thought {
            content: content.into(),
            timestamp: None,
            metadata: Metadata::new(),
        }
    }

    /// The visible text of this message.
    pub fn content(&self) -> &str {
        match self {
            Self::UserPrompt { content, .. }
            | Self::ToolResult { content, .. }
            | Self::AssistantReply { content, .. }
            | Self::System { content, .. }
            | Self::Thought { content, .. } => content,
            Self::Pointer { pointer, .. } => &pointer.reasoning,
        }
    }

    /// Arrival timestamp in ms since epoch, if the producer recorded one.
    pub fn timestamp(&self) -> Option<u64> {
        match self {
            Self::UserPrompt { timestamp, .. }
            | Self::ToolResult { timestamp, .. }
            | Self::AssistantReply { timestamp, .. }
            | Self::System { timestamp, .. }
            | Self::Thought { timestamp, .. }
            | Self::Pointer { timestamp, .. } => *timestamp,
        }
    }

    /// Attach a timestamp, returning the modified message.
    pub fn with_timestamp(mut self, ts: u64) -> Self {
        match &mut self {
            Self::UserPrompt { timestamp, .. }
            | Self::ToolResult { timestamp, .. }
            | Self::AssistantReply { timestamp, .. }
            | Self::System { timestamp, .. }
            | Self::Thought { timestamp, .. }
            | Self::Pointer { timestamp, .. } => *timestamp = Some(ts),
        }
        self
    }

    /// Metadata mapping, if this variant carries one.
    pub fn metadata(&self) -> Option<&Metadata> {
        match self {
            Self::UserPrompt { metadata, .. }
            | Self::ToolResult { metadata, .. }
            | Self::AssistantReply { metadata, .. }
            | Self::System { metadata, .. }
            | Self::Thought { metadata, .. } => Some(metadata),
            Self::Pointer { .. } => None,
        }
    }

    /// Set a metadata key, returning the modified message. No-op for pointers.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        if let Self::UserPrompt { metadata, .. }
        | Self::ToolResult { metadata, .. }
        | Self::AssistantReply { metadata, .. }
        | Self::System { metadata, .. }
        | Self::Thought { metadata, .. } = &mut self
        {
            metadata.insert(key.into(), value);
        }
        self
    }

    /// Priority read from the `"priority"` metadata key.
    ///
    /// Messages without an explicit priority default to `Medium`.
    pub fn priority(&self) -> Priority {
        self.metadata()
            .and_then(|m| m.get("priority"))
            .and_then(|v| v.as_str())
            .and_then(Priority::parse)
            .unwrap_or(Priority::Medium)
    }

    pub fn is_thought(&self) -> bool {
        matches!(self, Self::Thought { .. })
    }

    pub fn is_tool_result(&self) -> bool {
        matches!(self, Self::ToolResult { .. })
    }

    pub fn is_user_prompt(&self) -> bool {
        matches!(self, Self::UserPrompt { .. })
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Pointer { .. })
    }

    /// Short role marker used in rendered summaries and archives.
    pub fn role_label(&self) -> &'static str {
        match self {
            Self::UserPrompt { .. } => "user",
            Self::ToolResult { .. } => "tool",
            Self::AssistantReply { .. } => "assistant",
            Self::System { .. } => "system",
            Self::Thought { .. } => "thought",
            Self::Pointer { .. } => "pointer",
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
