use async_trait::async_trait;
use chatbridge_core::{
    ChatMessage, LLMConfig, LLMError, LLMProvider, LLMResponse, Role, TokenUsage,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::classify::classify_provider_error;

/// Provider type enum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// OpenAI (GPT models)
    #[default]
    OpenAI,
    /// Anthropic (Claude models)
    Anthropic,
    /// Ollama (local models)
    Ollama,
    /// DeepSeek
    DeepSeek,
    /// Groq
    Groq,
    /// Google (Gemini)
    Google,
    /// Mistral
    Mistral,
}

impl ProviderType {
    pub fn api_key_env_var(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::DeepSeek => Some("DEEPSEEK_API_KEY"),
            Self::Groq => Some("GROQ_API_KEY"),
            Self::Google => Some("GOOGLE_API_KEY"),
            Self::Mistral => Some("MISTRAL_API_KEY"),
            Self::Ollama => None, // Ollama doesn't need an API key
        }
    }

    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Self::Ollama => Some("http://localhost:11434"),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
            Self::DeepSeek => "deepseek",
            Self::Groq => "groq",
            Self::Google => "google",
            Self::Mistral => "mistral",
        }
    }

    fn to_llm_backend(&self) -> llm::builder::LLMBackend {
        match self {
            Self::OpenAI => llm::builder::LLMBackend::OpenAI,
            Self::Anthropic => llm::builder::LLMBackend::Anthropic,
            Self::Ollama => llm::builder::LLMBackend::Ollama,
            Self::DeepSeek => llm::builder::LLMBackend::DeepSeek,
            Self::Google => llm::builder::LLMBackend::Google,
            Self::Groq => llm::builder::LLMBackend::Groq,
            Self::Mistral => llm::builder::LLMBackend::Mistral,
        }
    }
}

impl FromStr for ProviderType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            "deepseek" => Ok(Self::DeepSeek),
            "groq" => Ok(Self::Groq),
            "google" => Ok(Self::Google),
            "mistral" => Ok(Self::Mistral),
            _ => Err("unknown provider type"),
        }
    }
}

/// Completion adapter backed by the `llm` crate.
///
/// A client is built per call so temperature and token limits can vary
/// between reply generation and summarization.
pub struct UnifiedLLMProvider {
    provider_type: ProviderType,
    model: String,
    api_key: Option<String>,
    base_url: Option<String>,
}

impl std::fmt::Debug for UnifiedLLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnifiedLLMProvider")
            .field("provider_type", &self.provider_type)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl UnifiedLLMProvider {
    pub fn new(
        provider_type: ProviderType,
        model: impl Into<String>,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> Self {
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let base_url = base_url
            .filter(|url| !url.trim().is_empty())
            .or_else(|| provider_type.default_base_url().map(|s| s.to_string()));

        Self {
            provider_type,
            model: model.into(),
            api_key,
            base_url,
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    fn convert_message(&self, msg: &ChatMessage) -> llm::chat::ChatMessage {
        match msg.role {
            Role::Assistant => llm::chat::ChatMessage::assistant()
                .content(&msg.content)
                .build(),
            Role::System | Role::User => {
                llm::chat::ChatMessage::user().content(&msg.content).build()
            }
        }
    }

    fn build_llm(
        &self,
        config: Option<&LLMConfig>,
        system: Option<String>,
    ) -> Result<Box<dyn llm::LLMProvider>, LLMError> {
        let mut builder = llm::builder::LLMBuilder::new()
            .backend(self.provider_type.to_llm_backend())
            .model(&self.model);

        if let Some(ref key) = self.api_key {
            builder = builder.api_key(key);
        }

        if let Some(ref url) = self.base_url {
            builder = builder.base_url(url);
        }

        if let Some(system) = system {
            builder = builder.system(system);
        }

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                builder = builder.temperature(temp);
            }
            if let Some(max_tok) = cfg.max_tokens {
                builder = builder.max_tokens(max_tok);
            }
        }

        builder
            .build()
            .map_err(|e| classify_provider_error(&format!("Failed to build LLM: {}", e)))
    }
}

#[async_trait]
impl LLMProvider for UnifiedLLMProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, LLMError> {
        if !self.is_configured() {
            return Err(LLMError::Auth(format!(
                "API key not configured for {}",
                self.provider_type.as_str()
            )));
        }

        // System turns travel through the backend's system prompt slot.
        let system_parts: Vec<&str> = messages
            .iter()
            .filter(|m| m.is_system())
            .map(|m| m.content.as_str())
            .collect();
        let system = (!system_parts.is_empty()).then(|| system_parts.join("\n\n"));

        let llm_messages: Vec<llm::chat::ChatMessage> = messages
            .iter()
            .filter(|m| !m.is_system())
            .map(|m| self.convert_message(m))
            .collect();

        let llm = self.build_llm(config, system)?;

        let response = llm.chat(&llm_messages).await.map_err(|e| {
            let err = classify_provider_error(&e.to_string());
            tracing::debug!(
                provider = self.provider_type.as_str(),
                kind = ?err.kind(),
                "Completion call failed"
            );
            err
        })?;

        let content = response.text().unwrap_or_default().trim().to_string();

        let usage = response.usage().map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(LLMResponse {
            content,
            usage,
            model: Some(self.model.clone()),
        })
    }

    fn provider_name(&self) -> &str {
        self.provider_type.as_str()
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some() || self.provider_type.api_key_env_var().is_none()
    }
}

pub struct ProviderBuilder {
    provider_type: Option<ProviderType>,
    model: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
}

impl ProviderBuilder {
    pub fn new() -> Self {
        Self {
            provider_type: None,
            model: None,
            api_key: None,
            base_url: None,
        }
    }

    pub fn provider(mut self, provider_type: ProviderType) -> Self {
        self.provider_type = Some(provider_type);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn build(self) -> Result<UnifiedLLMProvider, LLMError> {
        let provider_type = self.provider_type.unwrap_or_default();

        let model = self
            .model
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| LLMError::Unknown("Model not set".to_string()))?;

        Ok(UnifiedLLMProvider::new(
            provider_type,
            model,
            self.api_key,
            self.base_url,
        ))
    }
}

impl Default for ProviderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatbridge_core::LLMErrorKind;

    #[test]
    fn test_builder() {
        let provider = ProviderBuilder::new()
            .provider(ProviderType::OpenAI)
            .model("gpt-4o-mini")
            .api_key(Some("XXXXXXXXXX".to_string()))
            .build()
            .unwrap();

        assert_eq!(provider.provider_name(), "openai");
        assert_eq!(provider.model_name(), "gpt-4o-mini");
        assert!(provider.is_configured());
    }

    #[test]
    fn test_builder_missing_model() {
        let result = ProviderBuilder::new().provider(ProviderType::OpenAI).build();

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Model not set"));
    }

    #[test]
    fn test_blank_key_is_unconfigured() {
        let provider = UnifiedLLMProvider::new(
            ProviderType::OpenAI,
            "gpt-4o-mini",
            Some("   ".to_string()),
            None,
        );
        assert!(!provider.is_configured());

        let ollama = UnifiedLLMProvider::new(ProviderType::Ollama, "llama3", None, None);
        assert!(ollama.is_configured());
        assert_eq!(ollama.base_url(), Some("http://localhost:11434"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let provider = UnifiedLLMProvider::new(
            ProviderType::OpenAI,
            "gpt-4o-mini",
            Some("sk-secret".to_string()),
            None,
        );
        let rendered = format!("{:?}", provider);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_unconfigured_call_fails_with_auth() {
        let provider = UnifiedLLMProvider::new(ProviderType::OpenAI, "gpt-4o-mini", None, None);
        let err = provider
            .complete(&[ChatMessage::user("hello")], None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), LLMErrorKind::Auth);
    }

    #[test]
    fn test_provider_type_from_str() {
        assert_eq!("OpenAI".parse::<ProviderType>(), Ok(ProviderType::OpenAI));
        assert_eq!(" groq ".parse::<ProviderType>(), Ok(ProviderType::Groq));
        assert!("unknown".parse::<ProviderType>().is_err());
    }
}
