// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heuristic context categorization.
//!
//! Classifies raw content into a [`ContextEntry`] kind and priority via a
//! data-driven rule table: each rule is `(pattern, kind, priority,
//! score)`, scoring is explicit, the highest-scoring match wins, and ties
//! break by rule order.

use regex::Regex;
use vibe_core::{ContextEntry, EntryId, EntryKind, IdGen, Priority};

/// One classification rule.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub pattern: Regex,
    pub kind: EntryKind,
    pub priority: Priority,
    pub score: u32,
}

/// Rule-table classifier for context entries.
pub struct EntryClassifier {
    rules: Vec<CategoryRule>,
}

impl Default for EntryClassifier {
    fn default() -> Self {
        Self::new(builtin_rules())
    }
}

impl EntryClassifier {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    /// Classify content. Unmatched content is medium-priority user input.
    pub fn classify(&self, content: &str) -> (EntryKind, Priority) {
        // Highest score wins; ties break by rule order
        let mut best: Option<&CategoryRule> = None;
        for rule in &self.rules {
            if rule.pattern.is_match(content)
                && best.is_none_or(|b| rule.score > b.score)
            {
                best = Some(rule);
            }
        }
        best.map(|rule| (rule.kind, rule.priority))
            .unwrap_or((EntryKind::UserInput, Priority::Medium))
    }

    /// Classify content and build the entry record.
    pub fn build_entry<G: IdGen>(
        &self,
        content: impl Into<String>,
        id_gen: &G,
        now_ms: u64,
    ) -> ContextEntry {
        let content = content.into();
        let (kind, priority) = self.classify(&content);
        ContextEntry::new(EntryId::new(id_gen.mint()), kind, content, priority, now_ms)
    }
}

/// Built-in classification table.
///
/// Scores order overlapping matches: an error trace that mentions a file
/// path is still an error.
// Allow expect here as the regexes are compile-time verified to be valid
#[allow(clippy::expect_used)]
fn builtin_rules() -> Vec<CategoryRule> {
    let rule = |pattern: &str, kind, priority, score| CategoryRule {
        pattern: Regex::new(pattern).expect("constant regex pattern is valid"),
        kind,
        priority,
        score,
    };

    vec![
        rule(
            r"(?i)\b(?:error|panicked|exception|traceback|stack trace)\b",
            EntryKind::Error,
            Priority::High,
            50,
        ),
        rule(
            r"(?im)^\s*\$\s+\S|(?i)\b(?:npm run|cargo \w+|git \w+|make \w+)\b",
            EntryKind::Bash,
            Priority::Medium,
            40,
        ),
        rule(
            r"(?i)\b(?:decided|decision|chose|agreed|settled on)\b",
            EntryKind::Decision,
            Priority::High,
            35,
        ),
        rule(
            r"(?m)^\s*(?:fn|function|def|class|impl|pub fn)\s",
            EntryKind::Code,
            Priority::Medium,
            30,
        ),
        rule(
            r"(?i)\bsummary\b|^#+\s",
            EntryKind::Summary,
            Priority::Low,
            20,
        ),
        rule(
            r"[\w./-]+\.(?:rs|ts|js|py|json|toml|md)\b",
            EntryKind::File,
            Priority::Medium,
            10,
        ),
    ]
}

#[cfg(test)]
#[path = "categorize_tests.rs"]
mod tests;
