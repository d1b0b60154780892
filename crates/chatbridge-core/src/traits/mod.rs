//! Core traits for chatbridge

pub mod llm;

pub use llm::LLMProvider;
