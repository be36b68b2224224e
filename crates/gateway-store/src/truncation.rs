//! Token-budget, pair-atomic truncation (§4.2).
//!
//! Unlike count-based compaction (kept message-count semantics,
//! summary-as-system-message), this truncation is budget-driven: messages
//! are dropped from the oldest end by whole
//! `tool_call`/`tool_return` pairs until the remaining tail's estimated
//! token count fits `target_ratio * history_token_budget`, and the most
//! recent generation-toolset pair is protected from being dropped while
//! any other message could be dropped instead.

use crate::message::Message;

/// Budget knobs. Defaults match §12's resolution: keep the 0.80/0.40
/// ratios as configurable, not load-tuned, constants.
#[derive(Debug, Clone, Copy)]
pub struct TruncationConfig {
    pub history_token_budget: usize,
    pub trigger_ratio: f64,
    pub target_ratio: f64,
}

impl Default for TruncationConfig {
    fn default() -> Self {
        Self {
            history_token_budget: 32_000,
            trigger_ratio: 0.80,
            target_ratio: 0.40,
        }
    }
}

/// Estimates a token count for a message. Implementations form the
/// three-level fallback named in the design notes; the runtime picks one
/// at startup and caches a handle to it — this is a correctness-vs-
/// availability trade, not a per-call choice.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Default, always-available counter: `len / 2.5`, rounded up. The
/// cheapest member of the fallback chain; a model-aware or generic-BPE
/// counter can be substituted via [`TokenCounter`] without touching this
/// module's truncation logic.
#[derive(Debug, Default, Clone, Copy)]
pub struct CharHeuristicCounter;

impl TokenCounter for CharHeuristicCounter {
    fn count(&self, text: &str) -> usize {
        ((text.chars().count() as f64) / 2.5).ceil() as usize
    }
}

/// Rough textual surface of a message, for token estimation purposes only.
fn message_text(message: &Message) -> String {
    match message {
        Message::User { content, .. } | Message::AssistantText { content, .. } => content.clone(),
        Message::ToolCall { tool_name, arguments, .. } => format!("{tool_name} {arguments}"),
        Message::ToolReturn { tool_name, result, .. } => format!("{tool_name} {result}"),
    }
}

/// Total estimated token count over a message slice.
pub fn estimate_tokens(messages: &[Message], counter: &dyn TokenCounter) -> usize {
    messages.iter().map(|m| counter.count(&message_text(m))).sum()
}

/// A unit of truncation: either a standalone message, or a `tool_call` +
/// `tool_return` pair that must be kept or dropped together.
enum Group {
    Single(Message),
    Pair(Message, Message),
}

impl Group {
    fn messages(&self) -> Vec<&Message> {
        match self {
            Group::Single(m) => vec![m],
            Group::Pair(a, b) => vec![a, b],
        }
    }

    fn tool_name(&self) -> Option<&str> {
        match self {
            Group::Pair(Message::ToolCall { tool_name, .. }, _) => Some(tool_name),
            _ => None,
        }
    }

    fn into_messages(self) -> Vec<Message> {
        match self {
            Group::Single(m) => vec![m],
            Group::Pair(a, b) => vec![a, b],
        }
    }
}

/// Groups a flat message list into atomic units: a `tool_call` followed
/// immediately by its matching `tool_return` becomes one `Group::Pair`;
/// everything else is a `Group::Single`. An unpaired tool half (should not
/// occur given the session invariant) is kept as its own single group
/// rather than panicking.
fn group_messages(messages: Vec<Message>) -> Vec<Group> {
    let mut groups = Vec::with_capacity(messages.len());
    let mut iter = messages.into_iter().peekable();

    while let Some(message) = iter.next() {
        if let Message::ToolCall { ref tool_call_id, .. } = message {
            let matches_next = matches!(
                iter.peek(),
                Some(Message::ToolReturn { tool_call_id: next_id, .. }) if next_id == tool_call_id
            );
            if matches_next {
                let ret = iter.next().unwrap();
                groups.push(Group::Pair(message, ret));
                continue;
            }
        }
        groups.push(Group::Single(message));
    }

    groups
}

/// Result of a truncation pass.
pub struct TruncationOutcome {
    /// The messages to keep, in original order.
    pub kept: Vec<Message>,
    /// The messages dropped from the oldest end, in original order —
    /// feeds progressive summarization (§4.2.1) when enabled.
    pub dropped: Vec<Message>,
    /// Whether anything was actually dropped.
    pub truncated: bool,
}

/// Apply the truncation algorithm.
///
/// `is_generation_tool` identifies tool names belonging to the
/// `generation` toolset, so the most recent such pair can be protected;
/// gateway-store has no dependency on gateway-kernel's `Toolset` enum, so
/// callers pass the predicate rather than the enum itself.
pub fn truncate_messages(
    messages: Vec<Message>,
    counter: &dyn TokenCounter,
    config: &TruncationConfig,
    is_generation_tool: impl Fn(&str) -> bool,
) -> TruncationOutcome {
    let total = estimate_tokens(&messages, counter);
    let trigger_tokens = (config.history_token_budget as f64 * config.trigger_ratio) as usize;

    if total <= trigger_tokens {
        return TruncationOutcome {
            kept: messages,
            dropped: Vec::new(),
            truncated: false,
        };
    }

    let target_tokens = (config.history_token_budget as f64 * config.target_ratio) as usize;
    let mut groups = group_messages(messages);

    let protected_index = groups
        .iter()
        .enumerate()
        .rev()
        .find(|(_, g)| g.tool_name().is_some_and(&is_generation_tool))
        .map(|(i, _)| i);

    let mut dropped = Vec::new();

    loop {
        let current: Vec<Message> = groups.iter().flat_map(Group::messages).cloned().collect();
        if estimate_tokens(&current, counter) <= target_tokens {
            break;
        }

        let drop_at = groups
            .iter()
            .enumerate()
            .find(|(i, _)| Some(*i) != protected_index)
            .map(|(i, _)| i);

        match drop_at {
            Some(idx) => {
                let removed = groups.remove(idx);
                dropped.extend(removed.into_messages());
            }
            None => break, // nothing left that is safe to drop
        }
    }

    let kept = groups.into_iter().flat_map(Group::into_messages).collect();

    TruncationOutcome {
        kept,
        dropped,
        truncated: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolReturnStatus;

    fn user(text: &str, ts: i64) -> Message {
        Message::User { content: text.to_string(), timestamp: ts }
    }

    fn call(id: &str, name: &str, ts: i64) -> Message {
        Message::ToolCall {
            tool_call_id: id.to_string(),
            tool_name: name.to_string(),
            arguments: serde_json::json!({}),
            timestamp: ts,
        }
    }

    fn ret(id: &str, name: &str, ts: i64) -> Message {
        Message::ToolReturn {
            tool_call_id: id.to_string(),
            tool_name: name.to_string(),
            result: serde_json::json!({"ok": true}),
            status: ToolReturnStatus::Ok,
            timestamp: ts,
        }
    }

    #[test]
    fn under_budget_is_unchanged() {
        let messages = vec![user("hi", 1), user("there", 2)];
        let outcome = truncate_messages(
            messages.clone(),
            &CharHeuristicCounter,
            &TruncationConfig::default(),
            |_| false,
        );
        assert!(!outcome.truncated);
        assert_eq!(outcome.kept, messages);
        assert!(outcome.dropped.is_empty());
    }

    #[test]
    fn drops_from_oldest_end_by_whole_pairs() {
        let big = "x".repeat(5000);
        let mut messages = Vec::new();
        for i in 0..20 {
            messages.push(call(&format!("c{i}"), "get_teacher_classes", i * 2));
            messages.push(ret(&format!("c{i}"), "get_teacher_classes", i * 2 + 1));
            messages.push(user(&big, i * 2 + 1));
        }

        let config = TruncationConfig {
            history_token_budget: 4000,
            trigger_ratio: 0.80,
            target_ratio: 0.40,
        };
        let outcome = truncate_messages(messages, &CharHeuristicCounter, &config, |_| false);

        assert!(outcome.truncated);
        assert!(estimate_tokens(&outcome.kept, &CharHeuristicCounter) <= (4000.0 * 0.40) as usize + 2000);

        // Every kept tool_call still has its tool_return alongside it.
        let mut pending_calls = std::collections::HashSet::new();
        for m in &outcome.kept {
            match m {
                Message::ToolCall { tool_call_id, .. } => {
                    pending_calls.insert(tool_call_id.clone());
                }
                Message::ToolReturn { tool_call_id, .. } => {
                    assert!(pending_calls.remove(tool_call_id), "tool_return without preceding tool_call");
                }
                _ => {}
            }
        }
        assert!(pending_calls.is_empty(), "tool_call left without its tool_return");
    }

    #[test]
    fn protects_most_recent_generation_pair() {
        let big = "x".repeat(3000);
        let mut messages = vec![user(&big, 0)];
        for i in 0..10 {
            messages.push(call(&format!("c{i}"), "get_teacher_classes", i * 2 + 1));
            messages.push(ret(&format!("c{i}"), "get_teacher_classes", i * 2 + 2));
        }
        messages.push(call("gen-1", "generate_quiz_questions", 100));
        messages.push(ret("gen-1", "generate_quiz_questions", 101));

        let config = TruncationConfig {
            history_token_budget: 2000,
            trigger_ratio: 0.80,
            target_ratio: 0.10,
        };
        let outcome = truncate_messages(messages, &CharHeuristicCounter, &config, |name| {
            name == "generate_quiz_questions"
        });

        assert!(outcome.truncated);
        let has_gen_pair = outcome
            .kept
            .iter()
            .any(|m| matches!(m, Message::ToolCall { tool_name, .. } if tool_name == "generate_quiz_questions"));
        assert!(has_gen_pair, "protected generation pair must survive truncation");
    }

    #[test]
    fn char_heuristic_counter_matches_formula() {
        let counter = CharHeuristicCounter;
        assert_eq!(counter.count(""), 0);
        assert_eq!(counter.count("ab"), 1);
        assert_eq!(counter.count(&"a".repeat(10)), 4);
    }
}
