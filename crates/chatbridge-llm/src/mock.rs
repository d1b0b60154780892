use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chatbridge_core::{
    ChatMessage, LLMConfig, LLMError, LLMProvider, LLMResponse, TokenUsage,
};

/// Scriptable provider for tests.
///
/// Outcomes queued with [`push_response`](Self::push_response) and
/// [`push_error`](Self::push_error) are consumed first, in order. Once the
/// queue is empty every call fails with the persistent error if one is set,
/// otherwise answers with the steady reply. Clones share state, so a test can
/// keep one handle and give another to the code under test.
#[derive(Clone)]
pub struct MockLLMProvider {
    inner: Arc<RwLock<MockState>>,
}

struct MockState {
    name: String,
    scripted: VecDeque<Result<String, LLMError>>,
    steady_reply: String,
    error: Option<LLMError>,
    calls: Vec<MockCall>,
    latency_ms: u64,
    configured: bool,
}

impl MockState {
    fn new(name: String) -> Self {
        Self {
            name,
            scripted: VecDeque::new(),
            steady_reply: DEFAULT_REPLY.to_string(),
            error: None,
            calls: Vec::new(),
            latency_ms: 0,
            configured: true,
        }
    }
}

const DEFAULT_REPLY: &str = "Mock response";
const MOCK_MODEL: &str = "mock-model";

/// One recorded `complete` call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub messages: Vec<ChatMessage>,
    pub config: Option<LLMConfig>,
}

impl MockLLMProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MockState::new(name.into()))),
        }
    }

    pub fn set_response(&mut self, response: impl Into<String>) {
        self.inner.write().steady_reply = response.into();
    }

    pub fn push_response(&mut self, response: impl Into<String>) {
        self.inner.write().scripted.push_back(Ok(response.into()));
    }

    pub fn push_error(&mut self, error: LLMError) {
        self.inner.write().scripted.push_back(Err(error));
    }

    pub fn set_error(&mut self, error: LLMError) {
        self.inner.write().error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.inner.write().error = None;
    }

    pub fn set_latency(&mut self, latency_ms: u64) {
        self.inner.write().latency_ms = latency_ms;
    }

    /// An unconfigured mock reports `is_configured() == false` but still
    /// answers if called.
    pub fn set_configured(&mut self, configured: bool) {
        self.inner.write().configured = configured;
    }

    pub fn call_count(&self) -> usize {
        self.inner.read().calls.len()
    }

    pub fn call_history(&self) -> Vec<MockCall> {
        self.inner.read().calls.clone()
    }

    pub fn last_call(&self) -> Option<MockCall> {
        self.inner.read().calls.last().cloned()
    }

    pub fn clear_history(&mut self) {
        self.inner.write().calls.clear();
    }

    pub fn reset(&mut self) {
        let mut state = self.inner.write();
        let name = std::mem::take(&mut state.name);
        *state = MockState::new(name);
    }

    fn next_outcome(&self) -> Result<String, LLMError> {
        let mut state = self.inner.write();
        if let Some(outcome) = state.scripted.pop_front() {
            return outcome;
        }
        match &state.error {
            Some(error) => Err(error.clone()),
            None => Ok(state.steady_reply.clone()),
        }
    }
}

fn approx_tokens(text: &str) -> u32 {
    (text.chars().count() / 4) as u32
}

impl Default for MockLLMProvider {
    fn default() -> Self {
        Self::new("default")
    }
}

#[async_trait]
impl LLMProvider for MockLLMProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, LLMError> {
        let latency_ms = {
            let mut state = self.inner.write();
            state.calls.push(MockCall {
                messages: messages.to_vec(),
                config: config.cloned(),
            });
            state.latency_ms
        };
        if latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        }

        let content = self.next_outcome()?;
        let prompt_tokens: u32 = messages.iter().map(|m| approx_tokens(&m.content)).sum();
        let usage = TokenUsage::new(prompt_tokens, approx_tokens(&content));

        Ok(LLMResponse::new(content)
            .with_usage(usage)
            .with_model(MOCK_MODEL))
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        MOCK_MODEL
    }

    fn is_configured(&self) -> bool {
        self.inner.read().configured
    }
}

impl std::fmt::Debug for MockLLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MockLLMProvider")
            .field("name", &inner.name)
            .field("calls", &inner.calls.len())
            .field("scripted", &inner.scripted.len())
            .finish()
    }
}
