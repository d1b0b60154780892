//! Limits that drive trimming and auto-summarization

use serde::{Deserialize, Serialize};

use chatbridge_core::LLMConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Turns kept after the leading system turn.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Character footprint above which summarization is attempted.
    #[serde(default = "default_soft_char_limit")]
    pub soft_char_limit: usize,

    /// Exchanges kept verbatim across a rewrite; each counts as two turns.
    #[serde(default = "default_retention_window")]
    pub retention_window: usize,

    #[serde(default = "default_summary_input_cap")]
    pub summary_input_cap: usize,

    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,

    #[serde(default = "default_summary_temperature")]
    pub summary_temperature: f32,
}

fn default_max_turns() -> usize {
    12
}

fn default_soft_char_limit() -> usize {
    12_000
}

fn default_retention_window() -> usize {
    4
}

fn default_summary_input_cap() -> usize {
    8_000
}

fn default_summary_max_tokens() -> u32 {
    320
}

fn default_summary_temperature() -> f32 {
    0.2
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            soft_char_limit: default_soft_char_limit(),
            retention_window: default_retention_window(),
            summary_input_cap: default_summary_input_cap(),
            summary_max_tokens: default_summary_max_tokens(),
            summary_temperature: default_summary_temperature(),
        }
    }
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_soft_char_limit(mut self, limit: usize) -> Self {
        self.soft_char_limit = limit;
        self
    }

    pub fn with_retention_window(mut self, window: usize) -> Self {
        self.retention_window = window;
        self
    }

    pub fn with_summary_input_cap(mut self, cap: usize) -> Self {
        self.summary_input_cap = cap;
        self
    }

    pub fn with_summary_max_tokens(mut self, max_tokens: u32) -> Self {
        self.summary_max_tokens = max_tokens;
        self
    }

    pub fn with_summary_temperature(mut self, temperature: f32) -> Self {
        self.summary_temperature = temperature;
        self
    }

    /// Raw entries preserved after a rewrite.
    pub fn retained_turns(&self) -> usize {
        self.retention_window.saturating_mul(2)
    }

    pub fn summary_llm_config(&self) -> LLMConfig {
        LLMConfig::new()
            .with_temperature(self.summary_temperature)
            .with_max_tokens(self.summary_max_tokens)
    }
}
