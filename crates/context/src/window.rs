// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-request payload filter with threshold-driven pruning.
//!
//! `filter` is pure with respect to its input payload: ordering of
//! surviving messages is preserved, the current turn is never removed,
//! CRITICAL entries are never removed, and content is never modified,
//! only whole messages are dropped. The bounded cleaning history is the
//! one piece of shared mutable state and is guarded.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};
use vibe_core::{estimate_conversation_tokens, Clock, Message, Metadata, Priority};

/// Active window thresholds.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Hard token ceiling for an outbound payload
    pub max_tokens: usize,
    /// Fraction of `max_tokens` at which a warning is logged
    pub warning_threshold: f64,
    /// Fraction of `max_tokens` at which stale tool results are removed
    pub stale_tool_removal_threshold: f64,
    /// Fraction of tool-result messages removed, oldest first
    pub stale_tool_removal_percentage: f64,
    /// Cleaning results retained for diagnostics
    pub history_limit: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_tokens: 200_000,
            warning_threshold: 0.85,
            stale_tool_removal_threshold: 0.6,
            stale_tool_removal_percentage: 0.4,
            history_limit: 20,
        }
    }
}

/// Provider-bound request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub messages: Vec<Message>,
    pub model: String,
    /// Provider fields the filter passes through untouched
    #[serde(flatten)]
    pub extra: Metadata,
}

impl Payload {
    pub fn new(messages: Vec<Message>, model: impl Into<String>) -> Self {
        Self {
            messages,
            model: model.into(),
            extra: Metadata::new(),
        }
    }
}

/// How hard a cleaning pass pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningMode {
    Light,
    Aggressive,
}

/// Diagnostics from one `filter` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningResult {
    pub mode: CleaningMode,
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub removed_thoughts: usize,
    pub removed_tool_results: usize,
    /// Filter timestamp in ms since epoch
    pub timestamp: u64,
}

/// Filtering middleware over outbound payloads.
pub struct ActiveWindow<C: Clock> {
    config: WindowConfig,
    clock: C,
    history: Mutex<VecDeque<CleaningResult>>,
}

impl<C: Clock> ActiveWindow<C> {
    pub fn new(config: WindowConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            history: Mutex::new(VecDeque::new()),
        }
    }

    /// Transform a payload into its provider-bound form.
    pub fn filter(&self, payload: Payload) -> Payload {
        let tokens_before = estimate_conversation_tokens(&payload.messages);
        let stale_threshold =
            (self.config.max_tokens as f64 * self.config.stale_tool_removal_threshold) as usize;
        let warning_at =
            (self.config.max_tokens as f64 * self.config.warning_threshold) as usize;

        if tokens_before >= warning_at {
            warn!(
                tokens = tokens_before,
                max_tokens = self.config.max_tokens,
                "payload near token ceiling",
            );
        }

        let mode = if tokens_before >= stale_threshold {
            CleaningMode::Aggressive
        } else {
            CleaningMode::Light
        };

        // The active turn starts at the last user prompt; everything from
        // there on is untouchable.
        let active_start = payload
            .messages
            .iter()
            .rposition(Message::is_user_prompt)
            .unwrap_or(0);

        let mut removed_thoughts = 0usize;
        let mut removed_tool_results = 0usize;

        // Light cleaning: strip historical thought blocks
        let mut keep: Vec<bool> = payload
            .messages
            .iter()
            .enumerate()
            .map(|(i, message)| {
                let removable = i < active_start
                    && message.is_thought()
                    && message.priority() != Priority::Critical;
                if removable {
                    removed_thoughts += 1;
                }
                !removable
            })
            .collect();

        // Aggressive cleaning: drop the oldest slice of stale tool results
        if mode == CleaningMode::Aggressive {
            let stale_tools: Vec<usize> = payload
                .messages
                .iter()
                .enumerate()
                .filter(|(i, m)| {
                    *i < active_start
                        && keep[*i]
                        && m.is_tool_result()
                        && m.priority() != Priority::Critical
                })
                .map(|(i, _)| i)
                .collect();

            let to_remove = (stale_tools.len() as f64
                * self.config.stale_tool_removal_percentage)
                .floor() as usize;
            for &i in stale_tools.iter().take(to_remove) {
                keep[i] = false;
                removed_tool_results += 1;
            }
        }

        let messages: Vec<Message> = payload
            .messages
            .into_iter()
            .zip(keep)
            .filter_map(|(m, k)| k.then_some(m))
            .collect();

        let tokens_after = estimate_conversation_tokens(&messages);
        debug!(
            ?mode,
            tokens_before, tokens_after, removed_thoughts, removed_tool_results, "filtered payload",
        );

        self.record(CleaningResult {
            mode,
            tokens_before,
            tokens_after,
            removed_thoughts,
            removed_tool_results,
            timestamp: self.clock.wall_ms(),
        });

        Payload {
            messages,
            model: payload.model,
            extra: payload.extra,
        }
    }

    /// The most recent cleaning result.
    pub fn last_cleaning(&self) -> Option<CleaningResult> {
        self.history.lock().back().cloned()
    }

    /// Retained cleaning results, oldest first.
    pub fn cleaning_history(&self) -> Vec<CleaningResult> {
        self.history.lock().iter().cloned().collect()
    }

    fn record(&self, result: CleaningResult) {
        let mut history = self.history.lock();
        while history.len() >= self.config.history_limit.max(1) {
            history.pop_front();
        }
        history.push_back(result);
    }
}

#[cfg(test)]
#[path = "window_tests.rs"]
mod tests;
