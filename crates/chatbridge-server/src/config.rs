//! Server configuration: optional YAML file, then environment overrides

use std::env;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use tracing::warn;

use chatbridge_llm::{ProviderBuilder, ProviderType, UnifiedLLMProvider};
use chatbridge_memory::MemoryConfig;
use chatbridge_runtime::{DEFAULT_SYSTEM_PROMPT, ReplyConfig};

const DEFAULT_CONFIG_FILE: &str = "chatbridge.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub provider: ProviderSection,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub reply: ReplyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            system_prompt: default_system_prompt(),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct ProviderSection {
    #[serde(default)]
    pub kind: ProviderType,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            kind: ProviderType::default(),
            model: default_model(),
            api_key: None,
            base_url: None,
        }
    }
}

impl std::fmt::Debug for ProviderSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSection")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_deref().map(mask_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl AppConfig {
    /// File first (`CHATBRIDGE_CONFIG`, else `chatbridge.yaml` if present),
    /// then the process environment on top.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = load_from_file()?.unwrap_or_default();
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).map_err(|err| anyhow::anyhow!("Failed to parse config: {}", err))
    }

    /// Applies environment style overrides read through `lookup`. Values
    /// that fail to parse are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(host) = lookup("CHATBRIDGE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_var(&lookup, "CHATBRIDGE_PORT") {
            self.server.port = port;
        }
        if let Some(origins) = lookup("CHATBRIDGE_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(prompt) = lookup("CHATBRIDGE_SYSTEM_PROMPT") {
            self.server.system_prompt = prompt;
        }

        if let Some(kind) = parse_var(&lookup, "CHATBRIDGE_PROVIDER") {
            self.provider.kind = kind;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.provider.model = model;
        }
        if let Some(base_url) = lookup("OPENAI_BASE_URL") {
            self.provider.base_url = Some(base_url);
        }
        if let Some(api_key) = self.provider.kind.api_key_env_var().and_then(&lookup) {
            self.provider.api_key = Some(api_key);
        }

        let memory = &mut self.memory;
        if let Some(value) = parse_var(&lookup, "CHATBRIDGE_MAX_TURNS") {
            memory.max_turns = value;
        }
        if let Some(value) = parse_var(&lookup, "CHATBRIDGE_SOFT_CHAR_LIMIT") {
            memory.soft_char_limit = value;
        }
        if let Some(value) = parse_var(&lookup, "CHATBRIDGE_RETENTION_WINDOW") {
            memory.retention_window = value;
        }
        if let Some(value) = parse_var(&lookup, "CHATBRIDGE_SUMMARY_INPUT_CAP") {
            memory.summary_input_cap = value;
        }
        if let Some(value) = parse_var(&lookup, "CHATBRIDGE_SUMMARY_MAX_TOKENS") {
            memory.summary_max_tokens = value;
        }
        if let Some(value) = parse_var(&lookup, "CHATBRIDGE_SUMMARY_TEMPERATURE") {
            memory.summary_temperature = value;
        }

        if let Some(value) = parse_var(&lookup, "CHATBRIDGE_REPLY_MAX_TOKENS") {
            self.reply.max_tokens = value;
        }
        if let Some(value) = parse_var(&lookup, "CHATBRIDGE_REPLY_TEMPERATURE") {
            self.reply.temperature = value;
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn build_provider(&self) -> anyhow::Result<UnifiedLLMProvider> {
        ProviderBuilder::new()
            .provider(self.provider.kind)
            .model(&self.provider.model)
            .api_key(self.provider.api_key.clone())
            .base_url(self.provider.base_url.clone())
            .build()
            .map_err(|err| anyhow::anyhow!("Failed to build provider: {}", err))
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, value = %raw, error = %err, "Ignoring invalid configuration value");
            None
        }
    }
}

fn load_from_file() -> anyhow::Result<Option<AppConfig>> {
    let path = match env::var("CHATBRIDGE_CONFIG").ok() {
        Some(path) => Some(path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => Some(DEFAULT_CONFIG_FILE.to_string()),
        None => None,
    };

    let Some(path) = path else {
        return Ok(None);
    };

    let contents = fs::read_to_string(&path)
        .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path, err))?;
    let parsed = serde_yaml::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path, err))?;
    Ok(Some(parsed))
}

/// First few characters of a credential, for logs.
pub fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(6).collect();
    format!("{}...", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.server.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.server.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.provider.kind, ProviderType::OpenAI);
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert!(config.provider.api_key.is_none());
        assert_eq!(config.memory, MemoryConfig::default());
        assert_eq!(config.reply.max_tokens, 500);
    }

    #[test]
    fn test_yaml_sections() {
        let yaml = r#"
server:
  port: 9000
provider:
  kind: ollama
  model: llama3
memory:
  max_turns: 6
reply:
  max_tokens: 200
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.provider.kind, ProviderType::Ollama);
        assert_eq!(config.provider.model, "llama3");
        assert_eq!(config.memory.max_turns, 6);
        assert_eq!(config.memory.soft_char_limit, 12_000);
        assert_eq!(config.reply.max_tokens, 200);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = AppConfig::from_yaml("server:\n  port: 9000\n").unwrap();
        config.apply_overrides(lookup_from(&[
            ("CHATBRIDGE_PORT", "8123"),
            ("OPENAI_API_KEY", "sk-test-1234567890"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("CHATBRIDGE_CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("CHATBRIDGE_MAX_TURNS", "8"),
            ("CHATBRIDGE_SUMMARY_TEMPERATURE", "0.1"),
            ("CHATBRIDGE_REPLY_TEMPERATURE", "0.5"),
        ]));

        assert_eq!(config.server.port, 8123);
        assert_eq!(config.provider.api_key.as_deref(), Some("sk-test-1234567890"));
        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(config.server.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.memory.max_turns, 8);
        assert_eq!(config.memory.summary_temperature, 0.1);
        assert_eq!(config.reply.temperature, 0.5);
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup_from(&[
            ("CHATBRIDGE_PORT", "not-a-port"),
            ("CHATBRIDGE_MAX_TURNS", "-3"),
            ("CHATBRIDGE_PROVIDER", "nonexistent"),
            ("OPENAI_API_KEY", "   "),
        ]));

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.memory.max_turns, 12);
        assert_eq!(config.provider.kind, ProviderType::OpenAI);
        assert!(config.provider.api_key.is_none());
    }

    #[test]
    fn test_provider_key_follows_kind() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup_from(&[
            ("CHATBRIDGE_PROVIDER", "anthropic"),
            ("OPENAI_API_KEY", "sk-openai"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
        ]));
        assert_eq!(config.provider.kind, ProviderType::Anthropic);
        assert_eq!(config.provider.api_key.as_deref(), Some("sk-ant"));
    }

    #[test]
    fn test_google_provider_reads_its_own_key() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup_from(&[
            ("CHATBRIDGE_PROVIDER", "Google"),
            ("GOOGLE_API_KEY", "g-key"),
        ]));
        assert_eq!(config.provider.kind, ProviderType::Google);
        assert_eq!(config.provider.api_key.as_deref(), Some("g-key"));
    }

    #[test]
    fn test_debug_masks_api_key() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-secret-value".to_string());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret-value"));
        assert!(rendered.contains("sk-sec..."));
    }
}
