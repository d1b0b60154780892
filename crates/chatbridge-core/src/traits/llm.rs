//! LLM provider traits

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::message::ChatMessage;
use crate::types::{LLMConfig, LLMResponse};

/// A single-shot completion backend.
///
/// Implementations are stateless with respect to conversations and do not
/// retry. Callers decide what to do with each [`LLMError`] kind.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, LLMError>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;

    /// Whether credentials are present. An unconfigured provider fails every
    /// call with [`LLMError::Auth`].
    fn is_configured(&self) -> bool {
        true
    }
}

/// Failures a completion call can report.
#[derive(Debug, Clone, Error)]
pub enum LLMError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Context window exceeded: {0}")]
    ContextOverflow(String),

    #[error("Provider error: {message}")]
    Provider {
        message: String,
        status: Option<u16>,
    },

    #[error("Unknown error: {0}")]
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LLMErrorKind {
    Auth,
    RateLimited,
    ContextOverflow,
    Provider,
    Unknown,
}

impl LLMError {
    pub fn kind(&self) -> LLMErrorKind {
        match self {
            LLMError::Auth(_) => LLMErrorKind::Auth,
            LLMError::RateLimited { .. } => LLMErrorKind::RateLimited,
            LLMError::ContextOverflow(_) => LLMErrorKind::ContextOverflow,
            LLMError::Provider { .. } => LLMErrorKind::Provider,
            LLMError::Unknown(_) => LLMErrorKind::Unknown,
        }
    }

    pub fn is_context_overflow(&self) -> bool {
        matches!(self, LLMError::ContextOverflow(_))
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        LLMError::RateLimited {
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        LLMError::Provider {
            message: message.into(),
            status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    #[async_trait]
    impl LLMProvider for EchoProvider {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _config: Option<&LLMConfig>,
        ) -> Result<LLMResponse, LLMError> {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(LLMResponse::new(last))
        }

        fn provider_name(&self) -> &str {
            "echo"
        }

        fn model_name(&self) -> &str {
            "echo-1"
        }
    }

    #[tokio::test]
    async fn test_provider_defaults_to_configured() {
        let provider = EchoProvider;
        assert!(provider.is_configured());

        let response = provider
            .complete(&[ChatMessage::user("ping")], None)
            .await
            .unwrap();
        assert_eq!(response.content, "ping");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(LLMError::Auth("bad key".into()).kind(), LLMErrorKind::Auth);
        assert_eq!(
            LLMError::rate_limited("slow down").kind(),
            LLMErrorKind::RateLimited
        );
        assert_eq!(LLMError::provider("boom").kind(), LLMErrorKind::Provider);
        assert!(LLMError::ContextOverflow("too long".into()).is_context_overflow());
        assert!(!LLMError::Unknown("?".into()).is_context_overflow());
    }

    #[test]
    fn test_error_display() {
        let err = LLMError::ContextOverflow("maximum context length is 8192".into());
        assert!(err.to_string().contains("maximum context length"));
    }
}
