//! Session transcripts and auto-summarizing memory for chatbridge

mod config;
mod error;
mod manager;
mod store;
mod summarizer;
mod transcript;

pub use config::MemoryConfig;
pub use error::MemoryError;
pub use manager::{CompressionOutcome, MemoryManager, MemoryPressure};
pub use store::{SessionSnapshot, SessionStore};
pub use summarizer::{DEFAULT_SUMMARY_PROMPT, LLMSummarizer, SUMMARY_HEADER, Summarizer};
pub use transcript::Transcript;
