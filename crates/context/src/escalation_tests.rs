// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex;
use tempfile::tempdir;

/// Scripted LLM caller: pops responses front-to-back, errors when empty.
struct ScriptedLlm {
    responses: Mutex<Vec<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmCaller for ScriptedLlm {
    async fn complete(&self, prompt: &str, _max_tokens: usize) -> Result<String, LlmError> {
        self.prompts.lock().push(prompt.to_string());
        let mut responses = self.responses.lock();
        if responses.is_empty() {
            return Err(LlmError("no scripted response".to_string()));
        }
        responses.remove(0).map_err(LlmError)
    }
}

fn long_messages(count: usize, chars_each: usize) -> Vec<Message> {
    (0..count)
        .map(|i| Message::user(format!("{:04} {}", i, "m".repeat(chars_each - 5))))
        .collect()
}

#[tokio::test]
async fn small_input_needs_no_reduction() {
    let messages = vec![Message::user("hi"), Message::reply("hello")];
    let outcome = escalated_summarize(&messages, 10_000, EscalationOptions::default())
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.achieved_level, 0);
    assert!(outcome.levels_attempted.is_empty());
    assert_eq!(outcome.strategy, "none");
    assert!(outcome.content.contains("user: hi"));
}

#[tokio::test]
async fn level_one_accepted_when_materially_smaller() {
    let messages = long_messages(20, 500);
    let llm = ScriptedLlm::new(vec![Ok("a tight summary".to_string())]);

    let outcome = escalated_summarize(
        &messages,
        100,
        EscalationOptions {
            llm: Some(&llm),
            ..EscalationOptions::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome.achieved_level, 1);
    assert_eq!(outcome.levels_attempted, vec![1]);
    assert_eq!(outcome.strategy, "llm-detail");
    assert_eq!(outcome.content, "a tight summary");
    assert!(outcome.reduction_ratio > 0.9);
}

#[tokio::test]
async fn rejected_level_one_escalates_to_two() {
    let messages = long_messages(20, 500);
    let original_len = messages
        .iter()
        .map(|m| m.content().chars().count())
        .sum::<usize>();
    // L1 returns something barely smaller than the original: rejected
    let llm = ScriptedLlm::new(vec![
        Ok("n".repeat(original_len - 10)),
        Ok("- bullet summary".to_string()),
    ]);

    let outcome = escalated_summarize(
        &messages,
        100,
        EscalationOptions {
            llm: Some(&llm),
            ..EscalationOptions::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome.achieved_level, 2);
    assert_eq!(outcome.levels_attempted, vec![1, 2]);
    assert_eq!(outcome.strategy, "llm-bullets");

    // L2's prompt asks for half the caller target
    let prompts = llm.prompts();
    assert!(prompts[0].contains("Target about 100 tokens"));
    assert!(prompts[1].contains("Target about 50 tokens"));
}

#[tokio::test]
async fn llm_errors_fall_through_to_truncation() {
    let messages = long_messages(10, 200);
    let llm = ScriptedLlm::new(vec![
        Err("429 Too Many Requests".to_string()),
        Err("429 Too Many Requests".to_string()),
    ]);

    let outcome = escalated_summarize(
        &messages,
        40,
        EscalationOptions {
            llm: Some(&llm),
            ..EscalationOptions::default()
        },
    )
    .await
    .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.achieved_level, 3);
    assert_eq!(outcome.levels_attempted, vec![1, 2, 3]);
    assert_eq!(outcome.strategy, "truncation");
}

#[tokio::test]
async fn no_llm_goes_straight_to_truncation() {
    let messages = long_messages(50, 1_000);
    let target = 200;

    let outcome = escalated_summarize(&messages, target, EscalationOptions::default())
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.achieved_level, 3);
    assert_eq!(outcome.levels_attempted, vec![3]);
    assert!(outcome.content.starts_with("# Context Summary (Truncated)"));
    assert!(outcome.content.contains("Original message count: 50"));
    assert!(outcome.content.contains("more truncated"));

    // Bounded by the caller target (plus header allowance)
    let header_allowance = 120;
    assert!(outcome.content.chars().count() <= target * 4 + header_allowance);
}

#[tokio::test]
async fn truncation_shows_most_recent_with_role_markers() {
    let messages = vec![
        Message::user("oldest message that will not fit".repeat(10)),
        Message::tool("middle output".repeat(10)),
        Message::reply("newest answer"),
    ];

    let outcome = escalated_summarize(&messages, 100, EscalationOptions::default())
        .await
        .unwrap();

    // A 100-token target gives L3 room for the two newest messages
    assert!(outcome.content.contains("[assistant] newest answer"));
    assert!(outcome.content.contains("[tool] middle output"));
    assert!(!outcome.content.contains("oldest message"));
    assert!(outcome.content.contains("(1 more truncated)"));
}

#[tokio::test]
async fn tiny_target_still_succeeds() {
    let messages = long_messages(5, 400);
    let outcome = escalated_summarize(&messages, 1, EscalationOptions::default())
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.achieved_level, 3);
    assert!(!outcome.content.is_empty());
}

#[tokio::test]
async fn on_attempt_observes_ladder() {
    let messages = long_messages(10, 200);
    let llm = ScriptedLlm::new(vec![Err("bad".to_string()), Err("bad".to_string())]);
    let seen = Mutex::new(Vec::new());
    let observer = |level: u8| seen.lock().push(level);

    escalated_summarize(
        &messages,
        40,
        EscalationOptions {
            llm: Some(&llm),
            on_attempt: Some(&observer),
            ..EscalationOptions::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(*seen.lock(), vec![1, 2, 3]);
}

#[tokio::test]
async fn archives_original_before_summarizing() {
    let dir = tempdir().unwrap();
    let store = ArchiveStore::new(dir.path());
    let messages = long_messages(10, 200);

    escalated_summarize(
        &messages,
        40,
        EscalationOptions {
            archives: Some((&store, "esc-1")),
            ..EscalationOptions::default()
        },
    )
    .await
    .unwrap();

    let archived = store.load_compressed_archive("esc-1").unwrap().unwrap();
    assert_eq!(archived["targetTokens"], 40);
    assert_eq!(archived["messages"].as_array().unwrap().len(), 10);
}
