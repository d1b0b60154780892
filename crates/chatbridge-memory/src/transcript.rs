use serde::Serialize;

use chatbridge_core::ChatMessage;

/// Ordered turns of one session.
///
/// Entry 0 is always a system turn and survives every trim and rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    /// `[system, summary, tail...]`, the shape left behind by a successful
    /// summarization.
    pub(crate) fn compressed(
        system: ChatMessage,
        summary: ChatMessage,
        tail: Vec<ChatMessage>,
    ) -> Self {
        debug_assert!(system.is_system() && summary.is_system());
        let mut messages = Vec::with_capacity(tail.len() + 2);
        messages.push(system);
        messages.push(summary);
        messages.extend(tail);
        Self { messages }
    }

    /// The leading system turn followed by the last `keep` conversation turns.
    pub fn degraded(&self, keep: usize) -> Self {
        let mut messages = Vec::with_capacity(keep + 1);
        messages.push(self.system_turn().clone());
        messages.extend(self.tail(keep));
        Self { messages }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }

    pub fn system_turn(&self) -> &ChatMessage {
        &self.messages[0]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Entries after the leading system turn.
    pub fn turn_count(&self) -> usize {
        self.messages.len() - 1
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Keeps the leading system turn and the most recent `max_turns` entries
    /// after it. Returns how many entries were dropped.
    pub fn trim(&mut self, max_turns: usize) -> usize {
        let excess = self.turn_count().saturating_sub(max_turns);
        if excess > 0 {
            self.messages.drain(1..1 + excess);
        }
        excess
    }

    /// Total characters across every entry, system turns included.
    pub fn char_footprint(&self) -> usize {
        self.messages.iter().map(ChatMessage::char_len).sum()
    }

    /// User and assistant turns in order, skipping every system turn.
    pub fn conversation(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| !m.is_system())
    }

    /// The last `n` user/assistant turns.
    pub fn tail(&self, n: usize) -> Vec<ChatMessage> {
        let turns: Vec<&ChatMessage> = self.conversation().collect();
        let start = turns.len().saturating_sub(n);
        turns[start..].iter().map(|m| (*m).clone()).collect()
    }

    pub fn has_summary(&self) -> bool {
        self.messages.iter().skip(1).any(ChatMessage::is_system)
    }
}
