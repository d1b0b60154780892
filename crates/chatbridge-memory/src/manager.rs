//! Turn-count trimming and character-budget compression
//!
//! Every append trims the transcript to `max_turns`. A user append then checks
//! the character footprint; above the soft limit the conversation is
//! summarized once and the transcript is rewritten as
//! `[system, summary, last 2K turns]`. When summarization fails the rewrite
//! drops the summary and keeps only `[system, last 2K turns]`.

use std::sync::Arc;

use chatbridge_core::ChatMessage;

use crate::config::MemoryConfig;
use crate::error::MemoryError;
use crate::store::{SessionSnapshot, SessionStore};
use crate::summarizer::{SUMMARY_HEADER, Summarizer};
use crate::transcript::Transcript;

/// Memory pressure of a transcript, checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryPressure {
    Fresh,
    TurnOverflow,
    CharOverflow,
}

#[derive(Debug, Clone)]
pub enum CompressionOutcome {
    /// Footprint within budget; nothing rewritten.
    NotNeeded,
    /// Summary inserted and the tail retained.
    Compressed { retained: usize, summary_chars: usize },
    /// Summarization failed; only the tail was retained.
    ///
    /// `retained` counts user and assistant turns kept after the rewrite.
    DegradedTrim { retained: usize, error: MemoryError },
    /// The session was reset while the summary was being produced.
    Discarded,
}

pub struct MemoryManager {
    store: SessionStore,
    summarizer: Arc<dyn Summarizer>,
    config: MemoryConfig,
}

impl MemoryManager {
    pub fn new(store: SessionStore, summarizer: Arc<dyn Summarizer>, config: MemoryConfig) -> Self {
        Self {
            store,
            summarizer,
            config,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn assess(&self, transcript: &Transcript) -> MemoryPressure {
        if transcript.turn_count() > self.config.max_turns {
            MemoryPressure::TurnOverflow
        } else if transcript.char_footprint() > self.config.soft_char_limit {
            MemoryPressure::CharOverflow
        } else {
            MemoryPressure::Fresh
        }
    }

    /// Appends a user turn, trims, and compresses at most once if the
    /// character budget is exceeded. Summarization failures are absorbed.
    pub async fn record_user_turn(&self, session_id: &str, content: &str) -> CompressionOutcome {
        let max_turns = self.config.max_turns;
        let (snapshot, (pressure, footprint)) =
            self.store.update_snapshot(session_id, |transcript| {
                transcript.push(ChatMessage::user(content));
                let pressure = self.assess(transcript);
                transcript.trim(max_turns);
                (pressure, transcript.char_footprint())
            });

        tracing::debug!(
            session_id = %session_id,
            pressure = ?pressure,
            turns = snapshot.transcript.turn_count(),
            chars = footprint,
            "Recorded user turn"
        );

        if footprint <= self.config.soft_char_limit {
            return CompressionOutcome::NotNeeded;
        }

        tracing::info!(
            session_id = %session_id,
            chars = footprint,
            limit = self.config.soft_char_limit,
            "Character budget exceeded, summarizing"
        );
        self.compress_snapshot(session_id, snapshot).await
    }

    pub fn record_assistant_turn(&self, session_id: &str, content: &str) {
        let max_turns = self.config.max_turns;
        self.store.update(session_id, |transcript| {
            transcript.push(ChatMessage::assistant(content));
            transcript.trim(max_turns);
        });
    }

    /// Compresses the session regardless of its footprint. Used when the
    /// provider reports a context overflow.
    pub async fn compress(&self, session_id: &str) -> CompressionOutcome {
        let snapshot = self.store.snapshot(session_id);
        self.compress_snapshot(session_id, snapshot).await
    }

    /// The summary is produced outside the store lock; the rewrite is then
    /// applied to whatever the transcript holds at that point, so turns
    /// appended meanwhile are kept if they fall inside the retained tail.
    async fn compress_snapshot(&self, session_id: &str, snapshot: SessionSnapshot) -> CompressionOutcome {
        let keep = self.config.retained_turns();
        let max_turns = self.config.max_turns;

        let summary = self
            .summarizer
            .summarize(snapshot.transcript.messages())
            .await;

        let applied = self
            .store
            .update_if_epoch(session_id, snapshot.epoch, |current| match summary {
                Ok(summary) => {
                    let summary_chars = summary.chars().count();
                    let summary_turn = ChatMessage::system(format!("{}\n{}", SUMMARY_HEADER, summary));
                    // The summary occupies one turn slot; a trim must never
                    // reach it.
                    let tail = current.tail(keep.min(max_turns.saturating_sub(1)));
                    let mut rewritten = Transcript::compressed(
                        current.system_turn().clone(),
                        summary_turn,
                        tail,
                    );
                    rewritten.trim(max_turns);
                    let retained = rewritten.conversation().count();
                    *current = rewritten;
                    CompressionOutcome::Compressed {
                        retained,
                        summary_chars,
                    }
                }
                Err(error) => {
                    let mut rewritten = current.degraded(keep);
                    rewritten.trim(max_turns);
                    let retained = rewritten.conversation().count();
                    *current = rewritten;
                    CompressionOutcome::DegradedTrim { retained, error }
                }
            });

        let outcome = applied.unwrap_or(CompressionOutcome::Discarded);
        match &outcome {
            CompressionOutcome::Compressed {
                retained,
                summary_chars,
            } => tracing::info!(
                session_id = %session_id,
                retained,
                summary_chars,
                "Transcript compressed"
            ),
            CompressionOutcome::DegradedTrim { retained, error } => tracing::warn!(
                session_id = %session_id,
                retained,
                error = %error,
                "Summarization failed, kept recent turns only"
            ),
            CompressionOutcome::Discarded => tracing::debug!(
                session_id = %session_id,
                "Session reset during compression, rewrite dropped"
            ),
            CompressionOutcome::NotNeeded => {}
        }
        outcome
    }
}
