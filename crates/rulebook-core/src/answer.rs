//! Grounded answer generation from retrieved context.

use std::sync::Arc;

use rulebook_llm::{ChatOptions, ChatOutput, LlmProvider, Message};

use crate::error::AnswerError;

/// Grounding instruction placed ahead of the retrieved context in the system message.
pub const SYSTEM_TEMPLATE: &str = "Use only the following pieces of context to answer the question at the end.
If the answer is not contained in the context, say so explicitly rather than inventing one.
----------------
";

/// System message with the instruction and context, then the question as the user turn.
#[must_use]
pub fn build_messages(question: &str, context: &str) -> Vec<Message> {
    vec![
        Message::system(format!("{SYSTEM_TEMPLATE}{context}")),
        Message::user(question),
    ]
}

/// Turn model output into answer text. Never fails.
#[must_use]
pub fn extract_answer(output: ChatOutput) -> String {
    match output {
        ChatOutput::Text(text) => text,
        ChatOutput::Structured(map) => match map.get("text") {
            Some(serde_json::Value::String(text)) => text.clone(),
            _ => serde_json::Value::Object(map).to_string(),
        },
        ChatOutput::Opaque(value) => value.to_string(),
    }
}

pub struct AnswerComposer<P: LlmProvider> {
    provider: Arc<P>,
    options: ChatOptions,
}

impl<P: LlmProvider> AnswerComposer<P> {
    #[must_use]
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            options: ChatOptions::deterministic(),
        }
    }

    /// Ask the model to answer `question` from `context` alone.
    ///
    /// # Errors
    ///
    /// Returns [`AnswerError::Generation`] if the model call fails.
    pub async fn answer(&self, question: &str, context: &str) -> Result<String, AnswerError> {
        let messages = build_messages(question, context);
        let output = self.provider.chat(&messages, &self.options).await?;
        Ok(extract_answer(output))
    }
}

impl<P: LlmProvider> std::fmt::Debug for AnswerComposer<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerComposer")
            .field("provider", &self.provider.name())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use rulebook_llm::Role;
    use rulebook_llm::mock::MockProvider;
    use serde_json::json;

    use super::*;

    fn structured(value: serde_json::Value) -> ChatOutput {
        let serde_json::Value::Object(map) = value else {
            panic!("expected object");
        };
        ChatOutput::Structured(map)
    }

    #[test]
    fn messages_keep_roles_separate() {
        let messages = build_messages("What is X?", "X penalty: 5 yards");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.starts_with("Use only the following pieces of context"));
        assert!(messages[0].content.ends_with("----------------\nX penalty: 5 yards"));
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "What is X?");
    }

    #[test]
    fn empty_context_still_sends_instruction() {
        let messages = build_messages("q", "");
        assert_eq!(messages[0].content, SYSTEM_TEMPLATE);
    }

    #[test]
    fn instruction_restricts_answer_to_context() {
        let system = &build_messages("q", "ctx")[0].content;
        assert!(system.starts_with("Use only the following pieces of context"));
        assert!(system.contains("say so explicitly rather than inventing one"));
        assert!(system.ends_with("----------------\nctx"));
    }

    #[test]
    fn extract_text_verbatim() {
        assert_eq!(extract_answer(ChatOutput::Text("5 yards".into())), "5 yards");
    }

    #[test]
    fn extract_structured_text_field() {
        assert_eq!(
            extract_answer(structured(json!({"text": "5 yards", "id": 1}))),
            "5 yards"
        );
    }

    #[test]
    fn extract_structured_without_text_serializes() {
        let out = extract_answer(structured(json!({"answer": "5 yards"})));
        assert_eq!(out, r#"{"answer":"5 yards"}"#);
    }

    #[test]
    fn extract_structured_non_string_text_serializes_whole_object() {
        let out = extract_answer(structured(json!({"text": 5})));
        assert_eq!(out, r#"{"text":5}"#);
    }

    #[test]
    fn extract_opaque_serializes() {
        assert_eq!(extract_answer(ChatOutput::Opaque(json!([1, 2]))), "[1,2]");
    }

    #[tokio::test]
    async fn answer_uses_zero_temperature_and_context() {
        let provider = Arc::new(MockProvider::echoing());
        let composer = AnswerComposer::new(Arc::clone(&provider));

        let answer = composer
            .answer("How far?", "X penalty: 5 yards")
            .await
            .unwrap();

        assert!(answer.contains("X penalty: 5 yards"));
        let options = provider.last_options().unwrap();
        assert!(options.temperature.abs() < f32::EPSILON);
        assert_eq!(provider.last_messages()[1].content, "How far?");
    }

    #[tokio::test]
    async fn provider_failure_is_generation_error() {
        let composer = AnswerComposer::new(Arc::new(MockProvider::failing()));
        let err = composer.answer("q", "ctx").await.unwrap_err();
        assert!(matches!(err, AnswerError::Generation(_)));
    }
}
