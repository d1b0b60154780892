//! Chat request orchestration
//!
//! One request runs: record the user turn (trim, maybe compress), generate a
//! reply outside the store lock, fall back to canned text on any provider
//! failure, then record the assistant turn.

use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info, warn};

use chatbridge_core::{ChatError, ChatMessage, LLMConfig, LLMError, LLMProvider, Result};
use chatbridge_memory::{LLMSummarizer, MemoryConfig, MemoryManager, SessionStore, Transcript};

use crate::config::ReplyConfig;
use crate::fallback::FallbackResponder;

pub const DEFAULT_SYSTEM_PROMPT: &str = "คุณเป็น AI Chatbot ที่เป็นมิตรและช่วยเหลือผู้ใช้ \
ตอบคำถามเป็นภาษาไทยหรือภาษาอังกฤษตามที่ผู้ใช้ถาม \
ให้คำตอบที่ถูกต้อง กระชับ และเป็นประโยชน์ \
ใช้โทนเสียงที่เป็นมิตรและสุภาพ";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const PROBE_MAX_TOKENS: u32 = 5;

/// Where a reply came from.
#[derive(Debug, Clone)]
pub enum ReplySource {
    /// Generated by the provider. `attempts` is 2 when a context overflow
    /// forced a compress-and-retry.
    Model { attempts: u32 },
    Fallback { reason: LLMError },
}

impl ReplySource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ReplySource::Fallback { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub response: String,
    pub timestamp: String,
    pub session_id: String,
    pub source: ReplySource,
}

/// Result of a minimal provider round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    NotConfigured,
    Connected { model: String },
    Error { message: String },
}

impl ProviderStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, ProviderStatus::Connected { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            ProviderStatus::NotConfigured => "not_configured",
            ProviderStatus::Connected { .. } => "connected",
            ProviderStatus::Error { .. } => "error",
        }
    }

    /// Human readable description in the service's reply language.
    pub fn message(&self) -> String {
        match self {
            ProviderStatus::NotConfigured => "OpenAI API key ไม่ได้ตั้งค่า".to_string(),
            ProviderStatus::Connected { .. } => "เชื่อมต่อ OpenAI สำเร็จ".to_string(),
            ProviderStatus::Error { message } => format!("เกิดข้อผิดพลาด: {}", message),
        }
    }

    pub fn model(&self) -> Option<&str> {
        match self {
            ProviderStatus::Connected { model } => Some(model),
            _ => None,
        }
    }
}

pub struct ChatService {
    memory: MemoryManager,
    llm: Arc<dyn LLMProvider>,
    fallback: FallbackResponder,
    reply_config: LLMConfig,
}

impl ChatService {
    pub fn new(memory: MemoryManager, llm: Arc<dyn LLMProvider>) -> Self {
        Self {
            memory,
            llm,
            fallback: FallbackResponder::new(),
            reply_config: ReplyConfig::default().llm_config(),
        }
    }

    /// Wires a fresh session store and an LLM-backed summarizer that shares
    /// the reply provider.
    pub fn with_provider(
        llm: Arc<dyn LLMProvider>,
        system_prompt: impl Into<String>,
        memory_config: MemoryConfig,
    ) -> Self {
        let summarizer = LLMSummarizer::from_config(llm.clone(), &memory_config);
        let memory = MemoryManager::new(
            SessionStore::new(system_prompt),
            Arc::new(summarizer),
            memory_config,
        );
        Self::new(memory, llm)
    }

    pub fn with_reply_config(mut self, config: &ReplyConfig) -> Self {
        self.reply_config = config.llm_config();
        self
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    pub fn llm(&self) -> &Arc<dyn LLMProvider> {
        &self.llm
    }

    pub async fn chat(&self, session_id: &str, message: &str) -> Result<ChatReply> {
        if message.trim().is_empty() {
            return Err(ChatError::InvalidRequest("message cannot be empty".into()));
        }
        info!(session_id = %session_id, input_len = message.len(), "Starting chat");

        let outcome = self.memory.record_user_turn(session_id, message).await;
        debug!(session_id = %session_id, outcome = ?outcome, "User turn recorded");

        let (response, source) = match self.generate(session_id).await {
            Ok((content, attempts)) => (content, ReplySource::Model { attempts }),
            Err(reason) => {
                warn!(
                    session_id = %session_id,
                    kind = ?reason.kind(),
                    error = %reason,
                    "Completion failed, using fallback reply"
                );
                let content = self.fallback.respond(message).to_string();
                (content, ReplySource::Fallback { reason })
            }
        };

        self.memory.record_assistant_turn(session_id, &response);

        Ok(ChatReply {
            response,
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            session_id: session_id.to_string(),
            source,
        })
    }

    /// First attempt, then on context overflow exactly one compression and
    /// one retry. Any other failure, or a second failure, is returned.
    async fn generate(&self, session_id: &str) -> std::result::Result<(String, u32), LLMError> {
        if !self.llm.is_configured() {
            return Err(LLMError::Auth("API key not configured".into()));
        }

        match self.complete_transcript(session_id).await {
            Ok(content) => Ok((content, 1)),
            Err(error) if error.is_context_overflow() => {
                warn!(
                    session_id = %session_id,
                    error = %error,
                    "Context overflow, compressing and retrying once"
                );
                let outcome = self.memory.compress(session_id).await;
                debug!(session_id = %session_id, outcome = ?outcome, "Reactive compression done");

                let content = self.complete_transcript(session_id).await?;
                Ok((content, 2))
            }
            Err(error) => Err(error),
        }
    }

    async fn complete_transcript(&self, session_id: &str) -> std::result::Result<String, LLMError> {
        let transcript = self.memory.store().get_or_create(session_id);
        let response = self
            .llm
            .complete(transcript.messages(), Some(&self.reply_config))
            .await?;
        Ok(response.content)
    }

    /// Unknown ids read as a fresh transcript and are not registered.
    pub fn history(&self, session_id: &str) -> Transcript {
        self.memory.store().view(session_id)
    }

    pub fn reset(&self, session_id: &str) -> Transcript {
        info!(session_id = %session_id, "Session reset");
        self.memory.store().reset(session_id)
    }

    /// Sends a one-word prompt with a tiny token budget.
    pub async fn probe(&self) -> ProviderStatus {
        if !self.llm.is_configured() {
            return ProviderStatus::NotConfigured;
        }

        let ping = [ChatMessage::user("ping")];
        let config = LLMConfig::new().with_max_tokens(PROBE_MAX_TOKENS);
        match self.llm.complete(&ping, Some(&config)).await {
            Ok(_) => ProviderStatus::Connected {
                model: self.llm.model_name().to_string(),
            },
            Err(error) => {
                warn!(error = %error, "Provider probe failed");
                ProviderStatus::Error {
                    message: error.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatbridge_core::{LLMErrorKind, Role};
    use chatbridge_llm::MockLLMProvider;
    use chatbridge_memory::SUMMARY_HEADER;

    fn service_with(mock: &MockLLMProvider, config: MemoryConfig) -> ChatService {
        ChatService::with_provider(Arc::new(mock.clone()), "persona", config)
    }

    #[tokio::test]
    async fn test_chat_records_both_turns() {
        let mut mock = MockLLMProvider::new("test");
        mock.set_response("Hi! How can I help?");
        let service = service_with(&mock, MemoryConfig::default());

        let reply = service.chat("s1", "hello").await.unwrap();
        assert_eq!(reply.response, "Hi! How can I help?");
        assert_eq!(reply.session_id, "s1");
        assert!(matches!(reply.source, ReplySource::Model { attempts: 1 }));
        assert_eq!(reply.timestamp.len(), "2024-01-01 00:00:00".len());

        let history = service.history("s1");
        assert_eq!(history.len(), 3);
        assert_eq!(history.messages()[1].role, Role::User);
        assert_eq!(history.messages()[2].content, "Hi! How can I help?");
    }

    #[tokio::test]
    async fn test_reply_uses_transcript_and_reply_config() {
        let mock = MockLLMProvider::new("test");
        let service = service_with(&mock, MemoryConfig::default())
            .with_reply_config(&ReplyConfig::default().with_max_tokens(42));

        service.chat("s1", "question").await.unwrap();

        let call = mock.last_call().unwrap();
        assert_eq!(call.messages.len(), 2);
        assert_eq!(call.messages[0].content, "persona");
        assert_eq!(call.messages[1].content, "question");
        let config = call.config.unwrap();
        assert_eq!(config.max_tokens, Some(42));
        assert_eq!(config.temperature, Some(0.7));
    }

    #[tokio::test]
    async fn test_overflow_compresses_once_and_retries_once() {
        let mut mock = MockLLMProvider::new("test");
        mock.push_error(LLMError::ContextOverflow("maximum context length".into()));
        mock.push_response("condensed");
        mock.push_response("second attempt");
        let service = service_with(&mock, MemoryConfig::default());

        let reply = service.chat("s1", "hello").await.unwrap();
        assert_eq!(reply.response, "second attempt");
        assert!(matches!(reply.source, ReplySource::Model { attempts: 2 }));
        assert_eq!(mock.call_count(), 3);

        let calls = mock.call_history();
        assert_eq!(calls[1].messages[0].content, chatbridge_memory::DEFAULT_SUMMARY_PROMPT);
        assert!(calls[2].messages[1].content.starts_with(SUMMARY_HEADER));

        let history = service.history("s1");
        assert!(history.has_summary());
        assert_eq!(history.messages().last().unwrap().content, "second attempt");
    }

    #[tokio::test]
    async fn test_second_overflow_falls_back() {
        let mut mock = MockLLMProvider::new("test");
        mock.push_error(LLMError::ContextOverflow("too many tokens".into()));
        mock.push_response("condensed");
        mock.push_error(LLMError::ContextOverflow("too many tokens".into()));
        let service = service_with(&mock, MemoryConfig::default());

        let reply = service.chat("s1", "hello").await.unwrap();
        assert_eq!(reply.response, FallbackResponder::new().respond("hello"));
        match reply.source {
            ReplySource::Fallback { reason } => {
                assert_eq!(reason.kind(), LLMErrorKind::ContextOverflow)
            }
            other => panic!("expected fallback, got {:?}", other),
        }
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_provider_error_falls_back_without_retry() {
        let mut mock = MockLLMProvider::new("test");
        mock.set_error(LLMError::rate_limited("quota exceeded"));
        let service = service_with(&mock, MemoryConfig::default());

        let reply = service.chat("s1", "thank you").await.unwrap();
        assert_eq!(reply.response, FallbackResponder::new().respond("thank you"));
        assert!(reply.source.is_fallback());
        assert_eq!(mock.call_count(), 1);

        let history = service.history("s1");
        assert_eq!(history.len(), 3);
        assert_eq!(history.messages()[2].content, reply.response);
    }

    #[tokio::test]
    async fn test_not_configured_never_calls_provider() {
        let mut mock = MockLLMProvider::new("test");
        mock.set_configured(false);
        let service = service_with(&mock, MemoryConfig::default());

        let reply = service.chat("s1", "hello").await.unwrap();
        assert!(matches!(
            reply.source,
            ReplySource::Fallback {
                reason: LLMError::Auth(_)
            }
        ));
        assert_eq!(mock.call_count(), 0);
        assert_eq!(service.probe().await, ProviderStatus::NotConfigured);
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected() {
        let mock = MockLLMProvider::new("test");
        let service = service_with(&mock, MemoryConfig::default());

        let result = service.chat("s1", "   ").await;
        assert!(matches!(result, Err(ChatError::InvalidRequest(_))));
        assert!(!service.memory().store().contains("s1"));
    }

    #[tokio::test]
    async fn test_reset_then_history_is_fresh() {
        let mock = MockLLMProvider::new("test");
        let service = service_with(&mock, MemoryConfig::default());

        service.chat("s1", "hello").await.unwrap();
        let fresh = service.reset("s1");

        let history = service.history("s1");
        assert_eq!(history, fresh);
        assert_eq!(history.len(), 1);
        assert_eq!(history, service.history("untouched"));
    }

    #[tokio::test]
    async fn test_probe() {
        let mut mock = MockLLMProvider::new("test");
        let service = service_with(&mock, MemoryConfig::default());

        let status = service.probe().await;
        assert_eq!(
            status,
            ProviderStatus::Connected {
                model: "mock-model".into()
            }
        );
        assert!(status.is_available());
        let call = mock.last_call().unwrap();
        assert_eq!(call.messages[0].content, "ping");
        assert_eq!(call.config.unwrap().max_tokens, Some(5));

        mock.set_error(LLMError::Auth("invalid key".into()));
        let status = service.probe().await;
        assert_eq!(status.status(), "error");
        assert!(status.message().contains("invalid key"));
        assert!(status.model().is_none());
    }
}
