//! One question in, one grounded answer out.

use std::sync::Arc;

use rulebook_index::{IndexError, IndexManager, IndexSettings, RetrievalConfig, Retriever};
use rulebook_llm::LlmProvider;
use tracing::Instrument;

use crate::answer::AnswerComposer;
use crate::config::Config;
use crate::error::AskError;

/// Owns the index lifecycle and runs index, retrieve and answer for each question.
pub struct AskPipeline<P: LlmProvider + 'static> {
    manager: IndexManager<P>,
    retriever: Retriever<P>,
    composer: AnswerComposer<P>,
}

impl<P: LlmProvider + 'static> AskPipeline<P> {
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidSplitter`] for invalid chunking parameters.
    pub fn new(
        provider: Arc<P>,
        settings: IndexSettings,
        retrieval: RetrievalConfig,
    ) -> Result<Self, IndexError> {
        Ok(Self {
            manager: IndexManager::new(Arc::clone(&provider), settings)?,
            retriever: Retriever::new(Arc::clone(&provider), retrieval),
            composer: AnswerComposer::new(provider),
        })
    }

    /// # Errors
    ///
    /// Returns [`IndexError::InvalidSplitter`] for invalid chunking parameters.
    pub fn from_config(provider: Arc<P>, config: &Config) -> Result<Self, IndexError> {
        Self::new(provider, config.index_settings(), config.retrieval_config())
    }

    /// Answer `question` from the rulebook.
    ///
    /// # Errors
    ///
    /// Returns [`AskError::InvalidRequest`] for a blank question, otherwise the error
    /// of the first stage that failed.
    pub async fn ask(&self, question: &str) -> Result<String, AskError> {
        if question.trim().is_empty() {
            return Err(AskError::InvalidRequest("question is empty".into()));
        }
        tracing::info!(question_len = question.len(), "incoming question");

        let index = self
            .manager
            .ensure_index()
            .instrument(tracing::info_span!("ensure_index"))
            .await
            .map_err(AskError::Index)?;

        let context = self
            .retriever
            .retrieve(&index, question)
            .instrument(tracing::info_span!("retrieve", passages = index.len()))
            .await?;

        let answer = self
            .composer
            .answer(question, &context.text)
            .instrument(tracing::info_span!("answer", hits = context.hits.len()))
            .await?;

        tracing::debug!(answer_len = answer.len(), "question answered");
        Ok(answer)
    }

    /// Build the index ahead of the first question. Failures are logged, not returned;
    /// the next question retries the build.
    pub async fn warm_up(&self) -> bool {
        match self.manager.ensure_index().await {
            Ok(index) => {
                tracing::info!(passages = index.len(), "index warmed up");
                true
            }
            Err(e) => {
                tracing::warn!(kind = e.kind().as_str(), "index warm-up failed: {e}");
                false
            }
        }
    }

    #[must_use]
    pub fn index_ready(&self) -> bool {
        self.manager.is_built()
    }

    #[must_use]
    pub fn index_manager(&self) -> &IndexManager<P> {
        &self.manager
    }
}

impl<P: LlmProvider + 'static> std::fmt::Debug for AskPipeline<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AskPipeline")
            .field("manager", &self.manager)
            .field("retriever", &self.retriever)
            .field("composer", &self.composer)
            .finish()
    }
}
