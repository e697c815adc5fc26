use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Sampling parameters for a single chat call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChatOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl ChatOptions {
    /// Greedy sampling: identical inputs should produce identical answers.
    #[must_use]
    pub fn deterministic() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: None,
        }
    }
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self::deterministic()
    }
}

/// What a chat model handed back, before any text extraction.
///
/// Providers decide the tag; callers apply their own extraction rule per tag instead of
/// probing the shape of arbitrary JSON.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatOutput {
    /// Plain assistant text.
    Text(String),
    /// A JSON object, possibly exposing a `text` field.
    Structured(serde_json::Map<String, serde_json::Value>),
    /// Anything else the provider returned.
    Opaque(serde_json::Value),
}

impl ChatOutput {
    /// Classify a raw message `content` value.
    ///
    /// Arrays made only of `{"text": ...}` parts are joined into `Text`. `null` yields
    /// `None` since there is nothing to answer with.
    #[must_use]
    pub fn from_content(content: serde_json::Value) -> Option<Self> {
        use serde_json::Value;

        match content {
            Value::Null => None,
            Value::String(text) => Some(Self::Text(text)),
            Value::Object(map) => Some(Self::Structured(map)),
            Value::Array(parts) => {
                let texts: Option<Vec<&str>> = parts
                    .iter()
                    .map(|p| p.get("text").and_then(Value::as_str))
                    .collect();
                match texts {
                    Some(texts) if !texts.is_empty() => Some(Self::Text(texts.concat())),
                    _ => Some(Self::Opaque(Value::Array(parts))),
                }
            }
            other => Some(Self::Opaque(other)),
        }
    }
}

pub trait LlmProvider: Send + Sync {
    /// Send messages to the LLM and return its raw output.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> impl Future<Output = Result<ChatOutput, LlmError>> + Send;

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send;

    /// Embed several texts, returning one vector per input in input order.
    ///
    /// The default calls [`LlmProvider::embed`] sequentially.
    ///
    /// # Errors
    ///
    /// Returns the first embedding error encountered.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send {
        async move {
            let mut vectors = Vec::with_capacity(texts.len());
            for text in texts {
                vectors.push(self.embed(text).await?);
            }
            Ok(vectors)
        }
    }

    fn name(&self) -> &str;
}
