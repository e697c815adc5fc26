use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rulebook_core::{AskError, AskPipeline};
use rulebook_gateway::{HandlerError, INVALID_QUESTION, QuestionHandler};
use rulebook_llm::LlmProvider;

/// Serves gateway questions from an [`AskPipeline`].
pub struct PipelineHandler<P: LlmProvider + 'static> {
    pipeline: Arc<AskPipeline<P>>,
}

impl<P: LlmProvider + 'static> PipelineHandler<P> {
    #[must_use]
    pub fn new(pipeline: Arc<AskPipeline<P>>) -> Self {
        Self { pipeline }
    }
}

fn handler_error(e: &AskError) -> HandlerError {
    if e.is_invalid_request() {
        HandlerError::bad_request(INVALID_QUESTION)
    } else {
        HandlerError::internal(e.kind(), e.to_string())
    }
}

impl<P: LlmProvider + 'static> QuestionHandler for PipelineHandler<P> {
    fn answer(
        &self,
        question: String,
    ) -> Pin<Box<dyn Future<Output = Result<String, HandlerError>> + Send + '_>> {
        Box::pin(async move {
            self.pipeline
                .ask(&question)
                .await
                .map_err(|e| handler_error(&e))
        })
    }

    fn index_ready(&self) -> bool {
        self.pipeline.index_ready()
    }
}

#[cfg(test)]
mod tests {
    use rulebook_gateway::HandlerErrorKind;
    use rulebook_index::{IndexSettings, RetrievalConfig, SplitterConfig};
    use rulebook_llm::mock::MockProvider;

    use super::*;

    fn handler(provider: MockProvider, path: std::path::PathBuf) -> PipelineHandler<MockProvider> {
        let pipeline = AskPipeline::new(
            Arc::new(provider),
            IndexSettings {
                document_path: path,
                splitter: SplitterConfig {
                    chunk_size: 40,
                    chunk_overlap: 5,
                },
                ..IndexSettings::default()
            },
            RetrievalConfig::default(),
        )
        .unwrap();
        PipelineHandler::new(Arc::new(pipeline))
    }

    #[tokio::test]
    async fn answers_and_reports_readiness() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.txt");
        std::fs::write(&path, "X penalty: 5 yards.\n\nKickoff at midfield.").unwrap();
        let handler = handler(MockProvider::echoing(), path);

        assert!(!handler.index_ready());
        let answer = handler.answer("What is the X penalty?".into()).await.unwrap();
        assert!(answer.contains("X penalty: 5 yards"));
        assert!(handler.index_ready());
    }

    #[tokio::test]
    async fn blank_question_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(MockProvider::default(), dir.path().join("rules.txt"));

        let err = handler.answer("   ".into()).await.unwrap_err();
        assert_eq!(err.kind, HandlerErrorKind::BadRequest);
        assert_eq!(err.message, INVALID_QUESTION);
    }

    #[tokio::test]
    async fn missing_document_is_internal_with_class() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(MockProvider::default(), dir.path().join("missing.txt"));

        let err = handler.answer("anything?".into()).await.unwrap_err();
        assert_eq!(err.kind, HandlerErrorKind::Internal);
        assert_eq!(err.class, "document_load");
        assert!(err.message.contains("missing.txt"));
    }

    #[tokio::test]
    async fn generation_failure_is_internal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.txt");
        std::fs::write(&path, "X penalty: 5 yards.").unwrap();
        let handler = handler(MockProvider::failing(), path);

        let err = handler.answer("X penalty?".into()).await.unwrap_err();
        assert_eq!(err.kind, HandlerErrorKind::Internal);
        assert_eq!(err.class, "generation_service");
    }
}
