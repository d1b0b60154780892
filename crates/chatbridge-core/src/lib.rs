//! Core types and traits for chatbridge

pub mod error;
pub mod message;
pub mod traits;
pub mod types;

pub use error::{ChatError, Result};
pub use message::{ChatMessage, Role};
pub use traits::llm::{LLMError, LLMErrorKind, LLMProvider};
pub use types::{LLMConfig, LLMResponse, TokenUsage};
