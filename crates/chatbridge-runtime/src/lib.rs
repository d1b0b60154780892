//! Request orchestration, fallback replies and provider probing for chatbridge

mod config;
mod fallback;
mod service;
mod session;

pub use config::ReplyConfig;
pub use fallback::FallbackResponder;
pub use service::{ChatReply, ChatService, DEFAULT_SYSTEM_PROMPT, ProviderStatus, ReplySource};
pub use session::{DEFAULT_SESSION_ID, SESSION_HEADER, resolve_session_id};

pub use chatbridge_core::{ChatError, ChatMessage, LLMError, LLMProvider, Result, Role};
pub use chatbridge_memory::{CompressionOutcome, MemoryConfig, Transcript};
