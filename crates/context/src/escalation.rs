// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Three-level escalation summarization.
//!
//! L1 asks an injected LLM caller for a detail-preserving summary at the
//! caller's target; L2 asks for aggressive bullet points at half target;
//! L3 is deterministic truncation at quarter target and always succeeds.
//! A level's result is accepted only when it is at least 10% shorter than
//! the original in characters.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use vibe_core::{estimate_tokens, Message};
use vibe_storage::{ArchiveError, ArchiveStore};

/// Minimum character shrink for an LLM result to be accepted.
const ACCEPT_SHRINK: f64 = 0.10;

/// Default timeout for one LLM summarization call.
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from an LLM summarization call
#[derive(Debug, Error)]
#[error("llm call failed: {0}")]
pub struct LlmError(pub String);

/// Injected LLM access for L1/L2. The core implements no client itself.
#[async_trait]
pub trait LlmCaller: Send + Sync {
    /// Complete a summarization prompt, bounded by `max_tokens`.
    async fn complete(&self, prompt: &str, max_tokens: usize) -> Result<String, LlmError>;
}

/// Options for one escalation run.
#[derive(Default)]
pub struct EscalationOptions<'a> {
    /// LLM access for L1/L2; without it the ladder goes straight to L3
    pub llm: Option<&'a dyn LlmCaller>,
    /// Per-call timeout override
    pub llm_timeout: Option<Duration>,
    /// When set, the original messages are archived under
    /// `.vibe-flow/compressed-archives/` before summarizing
    pub archives: Option<(&'a ArchiveStore, &'a str)>,
    /// Observer invoked with each level as it is attempted
    pub on_attempt: Option<&'a (dyn Fn(u8) + Send + Sync)>,
}

/// Outcome of `escalated_summarize`.
#[derive(Debug, Clone, PartialEq)]
pub struct EscalationOutcome {
    pub success: bool,
    pub content: String,
    pub token_count: usize,
    /// 0 = no reduction needed, 1..=3 = accepted ladder level
    pub achieved_level: u8,
    pub levels_attempted: Vec<u8>,
    pub original_token_count: usize,
    /// Character shrink achieved, 0.0 when nothing was removed
    pub reduction_ratio: f64,
    pub strategy: &'static str,
}

/// Reduce a message sequence to roughly `target_tokens`.
///
/// Succeeds for every non-empty input and any target ≥ 1: when the LLM
/// levels fail, are rejected, or are unavailable, L3 truncation applies.
pub async fn escalated_summarize(
    messages: &[Message],
    target_tokens: usize,
    options: EscalationOptions<'_>,
) -> Result<EscalationOutcome, ArchiveError> {
    let original = render_messages(messages);
    let original_chars = original.chars().count();
    let original_token_count = estimate_tokens(&original);

    if let Some((archives, log_id)) = options.archives {
        let value = serde_json::json!({
            "targetTokens": target_tokens,
            "messages": messages,
        });
        archives.save_compressed_archive(log_id, &value)?;
    }

    // Level 0: already within budget
    if original_token_count <= target_tokens {
        return Ok(EscalationOutcome {
            success: true,
            content: original,
            token_count: original_token_count,
            achieved_level: 0,
            levels_attempted: Vec::new(),
            original_token_count,
            reduction_ratio: 0.0,
            strategy: "none",
        });
    }

    let timeout = options.llm_timeout.unwrap_or(DEFAULT_LLM_TIMEOUT);
    let mut levels_attempted = Vec::new();

    if let Some(llm) = options.llm {
        for (level, strategy, level_target) in [
            (1u8, "llm-detail", target_tokens),
            (2u8, "llm-bullets", target_tokens.div_ceil(2)),
        ] {
            levels_attempted.push(level);
            if let Some(cb) = options.on_attempt {
                cb(level);
            }

            let prompt = build_prompt(level, &original, level_target);
            let call = llm.complete(&prompt, level_target);
            let result = match tokio::time::timeout(timeout, call).await {
                Ok(Ok(content)) => content,
                Ok(Err(e)) => {
                    warn!(level, error = %e, "summarization level failed, escalating");
                    continue;
                }
                Err(_) => {
                    warn!(level, timeout_s = timeout.as_secs(), "summarization level timed out");
                    continue;
                }
            };

            if !is_result_smaller(&result, original_chars) {
                debug!(level, "summary not materially smaller, escalating");
                continue;
            }

            return Ok(finish(
                result,
                level,
                levels_attempted,
                original_chars,
                original_token_count,
                strategy,
            ));
        }
    }

    // Level 3 never fails
    levels_attempted.push(3);
    if let Some(cb) = options.on_attempt {
        cb(3);
    }
    let truncated = truncate_messages(messages, target_tokens.div_ceil(4).max(1));
    Ok(finish(
        truncated,
        3,
        levels_attempted,
        original_chars,
        original_token_count,
        "truncation",
    ))
}

fn finish(
    content: String,
    achieved_level: u8,
    levels_attempted: Vec<u8>,
    original_chars: usize,
    original_token_count: usize,
    strategy: &'static str,
) -> EscalationOutcome {
    let content_chars = content.chars().count();
    let reduction_ratio = if original_chars == 0 {
        0.0
    } else {
        1.0 - content_chars as f64 / original_chars as f64
    };
    EscalationOutcome {
        success: true,
        token_count: estimate_tokens(&content),
        content,
        achieved_level,
        levels_attempted,
        original_token_count,
        reduction_ratio,
        strategy,
    }
}

/// `role: content` lines, the canonical flat rendering of a window.
fn render_messages(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role_label(), m.content()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_prompt(level: u8, original: &str, target_tokens: usize) -> String {
    let instruction = match level {
        1 => {
            "Summarize the conversation below. Preserve every concrete detail: \
             decisions, file paths, identifiers, numbers, and open questions."
        }
        _ => {
            "Compress the conversation below into terse bullet points. \
             Keep only decisions, outcomes, and file references."
        }
    };
    format!(
        "{}\nTarget about {} tokens.\n\n---\n{}",
        instruction, target_tokens, original
    )
}

/// Accepted only when at least 10% shorter than the original.
fn is_result_smaller(result: &str, original_chars: usize) -> bool {
    (result.chars().count() as f64) <= original_chars as f64 * (1.0 - ACCEPT_SHRINK)
}

/// Deterministic L3 truncation.
///
/// Produces a header, a per-message character budget over the most recent
/// messages, role-marked truncated entries, and a trailing count of
/// whatever did not fit.
fn truncate_messages(messages: &[Message], target_tokens: usize) -> String {
    const MIN_CHARS_PER_MESSAGE: usize = 40;

    let char_budget = target_tokens * vibe_core::token::CHARS_PER_TOKEN;
    let shown = messages
        .len()
        .min((char_budget / MIN_CHARS_PER_MESSAGE).max(1));
    let per_message = (char_budget / shown).max(1);

    let mut out = format!(
        "# Context Summary (Truncated)\n\nOriginal message count: {}\n\n",
        messages.len()
    );

    // Most recent messages carry the most signal
    let visible = &messages[messages.len() - shown..];
    for message in visible {
        let content: String = message.content().chars().take(per_message).collect();
        out.push_str(&format!("[{}] {}\n", message.role_label(), content));
    }

    let hidden = messages.len() - shown;
    if hidden > 0 {
        out.push_str(&format!("({} more truncated)\n", hidden));
    }
    out
}

#[cfg(test)]
#[path = "escalation_tests.rs"]
mod tests;
