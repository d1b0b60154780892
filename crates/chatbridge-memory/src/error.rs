use thiserror::Error;

use chatbridge_core::LLMError;

#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    #[error("Summarization failed: {0}")]
    Summarization(#[from] LLMError),

    #[error("Summarizer returned an empty summary")]
    EmptySummary,
}
