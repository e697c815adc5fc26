//! Test-only mock LLM provider.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::LlmError;
use crate::provider::{ChatOptions, ChatOutput, LlmProvider, Message, Role};

/// Dimensions of the hashed bag-of-words embedding.
pub const MOCK_EMBEDDING_DIM: usize = 64;

#[derive(Debug, Default)]
struct Calls {
    chat: AtomicUsize,
    embed: AtomicUsize,
    embed_batch: AtomicUsize,
}

#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<ChatOutput>>>,
    last_messages: Arc<Mutex<Vec<Message>>>,
    last_options: Arc<Mutex<Option<ChatOptions>>>,
    calls: Arc<Calls>,
    fail_embed: Arc<AtomicBool>,
    pub default_response: String,
    /// Answer with the system message content instead of `default_response`.
    pub echo_context: bool,
    pub fail_chat: bool,
    pub embedding_dim: usize,
    /// Milliseconds to sleep before returning a response.
    pub delay_ms: u64,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            last_messages: Arc::new(Mutex::new(Vec::new())),
            last_options: Arc::new(Mutex::new(None)),
            calls: Arc::new(Calls::default()),
            fail_embed: Arc::new(AtomicBool::new(false)),
            default_response: "mock response".into(),
            echo_context: false,
            fail_chat: false,
            embedding_dim: MOCK_EMBEDDING_DIM,
            delay_ms: 0,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<ChatOutput>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    /// A provider whose answer is the context it was given.
    #[must_use]
    pub fn echoing() -> Self {
        Self {
            echo_context: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    #[must_use]
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    /// Make every embedding call fail until switched back. Shared by all clones.
    pub fn set_fail_embed(&self, fail: bool) {
        self.fail_embed.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn chat_calls(&self) -> usize {
        self.calls.chat.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn embed_calls(&self) -> usize {
        self.calls.embed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn embed_batch_calls(&self) -> usize {
        self.calls.embed_batch.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn last_messages(&self) -> Vec<Message> {
        self.last_messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn last_options(&self) -> Option<ChatOptions> {
        *self
            .last_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn pause(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
    }

    fn check_embed(&self) -> Result<(), LlmError> {
        if self.fail_embed.load(Ordering::SeqCst) {
            return Err(LlmError::Other("mock embedding error".into()));
        }
        Ok(())
    }

    /// Lowercased alphanumeric words hashed into `embedding_dim` buckets.
    fn hashed_embedding(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.embedding_dim.max(1)];
        let buckets = vector.len() as u64;
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            #[allow(clippy::cast_possible_truncation)]
            let bucket = (hasher.finish() % buckets) as usize;
            vector[bucket] += 1.0;
        }
        vector
    }
}

impl LlmProvider for MockProvider {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatOutput, LlmError> {
        self.calls.chat.fetch_add(1, Ordering::SeqCst);
        *self
            .last_messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = messages.to_vec();
        *self
            .last_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(*options);

        self.pause().await;
        if self.fail_chat {
            return Err(LlmError::Other("mock LLM error".into()));
        }

        if self.echo_context {
            let system = messages
                .iter()
                .find(|m| m.role == Role::System)
                .map(|m| m.content.clone())
                .unwrap_or_default();
            return Ok(ChatOutput::Text(system));
        }

        let mut responses = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if responses.is_empty() {
            Ok(ChatOutput::Text(self.default_response.clone()))
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.calls.embed.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.check_embed()?;
        Ok(self.hashed_embedding(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        self.calls.embed_batch.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.check_embed()?;
        Ok(texts.iter().map(|t| self.hashed_embedding(t)).collect())
    }
}
