//! Summarizer trait and the LLM-backed implementation used for compression

use std::sync::Arc;

use async_trait::async_trait;

use chatbridge_core::{ChatMessage, LLMConfig, LLMProvider};

use crate::config::MemoryConfig;
use crate::error::MemoryError;

/// Prefix of the synthetic system turn that carries a summary.
pub const SUMMARY_HEADER: &str = "[previous context summary]";

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Condenses the given turns. System turns in the input are ignored.
    async fn summarize(&self, messages: &[ChatMessage]) -> Result<String, MemoryError>;
}

pub struct LLMSummarizer {
    llm: Arc<dyn LLMProvider>,
    prompt: String,
    input_cap: usize,
    llm_config: LLMConfig,
}

impl LLMSummarizer {
    pub fn new(llm: Arc<dyn LLMProvider>) -> Self {
        Self::from_config(llm, &MemoryConfig::default())
    }

    pub fn from_config(llm: Arc<dyn LLMProvider>, config: &MemoryConfig) -> Self {
        Self {
            llm,
            prompt: DEFAULT_SUMMARY_PROMPT.to_string(),
            input_cap: config.summary_input_cap,
            llm_config: config.summary_llm_config(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_input_cap(mut self, cap: usize) -> Self {
        self.input_cap = cap;
        self
    }

    pub fn with_llm_config(mut self, config: LLMConfig) -> Self {
        self.llm_config = config;
        self
    }

    /// `"<ROLE>: <content>"` per turn, newline joined, cut to the input cap.
    fn format_messages(&self, messages: &[ChatMessage]) -> String {
        let joined = messages
            .iter()
            .filter(|m| !m.is_system())
            .map(ChatMessage::render)
            .collect::<Vec<_>>()
            .join("\n");

        match joined.char_indices().nth(self.input_cap) {
            Some((byte_idx, _)) => joined[..byte_idx].to_string(),
            None => joined,
        }
    }
}

#[async_trait]
impl Summarizer for LLMSummarizer {
    async fn summarize(&self, messages: &[ChatMessage]) -> Result<String, MemoryError> {
        let conversation = self.format_messages(messages);
        if conversation.is_empty() {
            return Err(MemoryError::EmptySummary);
        }

        let llm_messages = vec![
            ChatMessage::system(&self.prompt),
            ChatMessage::user(conversation),
        ];

        let response = self
            .llm
            .complete(&llm_messages, Some(&self.llm_config))
            .await?;

        let summary = response.content.trim().to_string();
        if summary.is_empty() {
            return Err(MemoryError::EmptySummary);
        }
        Ok(summary)
    }
}

pub const DEFAULT_SUMMARY_PROMPT: &str = "คุณเป็นผู้ช่วยสรุปบทสนทนา \
สรุปบทสนทนาต่อไปนี้เป็นภาษาไทยอย่างกระชับ \
เก็บข้อเท็จจริง ความต้องการของผู้ใช้ และข้อตกลงที่สำคัญไว้ให้ครบ \
ความยาวไม่เกิน 12 บรรทัด";

#[cfg(test)]
mod tests {
    use super::*;
    use chatbridge_core::{LLMError, Role};
    use chatbridge_llm::MockLLMProvider;

    #[tokio::test]
    async fn test_llm_summarizer_basic() {
        let mut mock = MockLLMProvider::new("test");
        mock.set_response("  Test summary \n");
        let summarizer = LLMSummarizer::new(Arc::new(mock.clone()));

        let messages = vec![ChatMessage::user("Hello"), ChatMessage::assistant("Hi there!")];

        let summary = summarizer.summarize(&messages).await.unwrap();
        assert_eq!(summary, "Test summary");

        let call = mock.last_call().unwrap();
        assert_eq!(call.messages.len(), 2);
        assert_eq!(call.messages[0].role, Role::System);
        assert_eq!(call.messages[0].content, DEFAULT_SUMMARY_PROMPT);
        assert_eq!(call.messages[1].content, "USER: Hello\nASSISTANT: Hi there!");

        let config = call.config.unwrap();
        assert_eq!(config.max_tokens, Some(320));
        assert_eq!(config.temperature, Some(0.2));
    }

    #[tokio::test]
    async fn test_system_turns_are_excluded() {
        let mock = MockLLMProvider::new("test");
        let summarizer = LLMSummarizer::new(Arc::new(mock.clone()));

        let messages = vec![
            ChatMessage::system("persona"),
            ChatMessage::system("[previous context summary]\nold"),
            ChatMessage::user("question"),
        ];
        summarizer.summarize(&messages).await.unwrap();

        let call = mock.last_call().unwrap();
        assert_eq!(call.messages[1].content, "USER: question");
    }

    #[tokio::test]
    async fn test_input_is_truncated_to_cap() {
        let mock = MockLLMProvider::new("test");
        let summarizer = LLMSummarizer::new(Arc::new(mock.clone())).with_input_cap(10);

        let messages = vec![ChatMessage::user("สวัสดีครับยินดีต้อนรับ")];
        summarizer.summarize(&messages).await.unwrap();

        let sent = &mock.last_call().unwrap().messages[1].content;
        assert_eq!(sent.chars().count(), 10);
        assert!(sent.starts_with("USER: "));
    }

    #[tokio::test]
    async fn test_empty_conversation_is_an_error() {
        let mock = MockLLMProvider::new("test");
        let summarizer = LLMSummarizer::new(Arc::new(mock.clone()));

        let result = summarizer.summarize(&[ChatMessage::system("persona")]).await;
        assert!(matches!(result, Err(MemoryError::EmptySummary)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_summary_is_an_error() {
        let mut mock = MockLLMProvider::new("test");
        mock.set_response("   ");
        let summarizer = LLMSummarizer::new(Arc::new(mock));

        let result = summarizer.summarize(&[ChatMessage::user("hi")]).await;
        assert!(matches!(result, Err(MemoryError::EmptySummary)));
    }

    #[tokio::test]
    async fn test_provider_error_is_wrapped() {
        let mut mock = MockLLMProvider::new("test");
        mock.set_error(LLMError::rate_limited("quota"));
        let summarizer = LLMSummarizer::new(Arc::new(mock));

        let result = summarizer.summarize(&[ChatMessage::user("hi")]).await;
        assert!(matches!(
            result,
            Err(MemoryError::Summarization(LLMError::RateLimited { .. }))
        ));
    }

    #[tokio::test]
    async fn test_custom_prompt_and_config() {
        let mock = MockLLMProvider::new("test");
        let summarizer = LLMSummarizer::new(Arc::new(mock.clone()))
            .with_prompt("Summarize in English")
            .with_llm_config(LLMConfig::new().with_max_tokens(64));

        summarizer.summarize(&[ChatMessage::user("hi")]).await.unwrap();

        let call = mock.last_call().unwrap();
        assert_eq!(call.messages[0].content, "Summarize in English");
        assert_eq!(call.config.unwrap().max_tokens, Some(64));
    }
}
