//! Completion provider adapters for chatbridge

pub mod classify;
pub mod mock;
pub mod providers;

pub use chatbridge_core::{
    ChatMessage, LLMConfig, LLMError, LLMErrorKind, LLMProvider, LLMResponse, Role,
    TokenUsage,
};
pub use classify::classify_provider_error;
pub use mock::{MockCall, MockLLMProvider};
pub use providers::{ProviderBuilder, ProviderType, UnifiedLLMProvider};
