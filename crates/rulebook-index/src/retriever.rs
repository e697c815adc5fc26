//! Top-k passage retrieval and context formatting.

use std::sync::Arc;

use rulebook_llm::LlmProvider;

use crate::error::IndexError;
use crate::store::{EmbeddingIndex, ScoredPassage};

/// Separator placed between passages in the context string.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalConfig {
    /// Passages handed to the answer step.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

/// One retrieved passage, by position in the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievedHit {
    pub passage_index: usize,
    pub score: f32,
}

/// Ranked hits plus the passages joined into a single context string.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedContext {
    pub hits: Vec<RetrievedHit>,
    pub text: String,
}

impl RetrievedContext {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Join passage texts in rank order. Overlapping text is kept as is.
#[must_use]
pub fn format_as_context(hits: &[ScoredPassage<'_>]) -> String {
    hits.iter()
        .map(|h| h.passage.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

pub struct Retriever<P: LlmProvider> {
    provider: Arc<P>,
    config: RetrievalConfig,
}

impl<P: LlmProvider> Retriever<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, config: RetrievalConfig) -> Self {
        Self { provider, config }
    }

    #[must_use]
    pub fn config(&self) -> RetrievalConfig {
        self.config
    }

    /// Retrieve the configured `top_k` passages for `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding the query fails.
    pub async fn retrieve(
        &self,
        index: &EmbeddingIndex,
        query: &str,
    ) -> Result<RetrievedContext, IndexError> {
        self.retrieve_top(index, query, self.config.top_k).await
    }

    /// Retrieve the `k` passages most similar to `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding the query fails.
    pub async fn retrieve_top(
        &self,
        index: &EmbeddingIndex,
        query: &str,
        k: usize,
    ) -> Result<RetrievedContext, IndexError> {
        let scored = index.query(self.provider.as_ref(), query, k).await?;
        tracing::debug!(
            hits = scored.len(),
            top_score = scored.first().map(|h| h.score),
            "passages retrieved"
        );

        Ok(RetrievedContext {
            text: format_as_context(&scored),
            hits: scored
                .iter()
                .map(|h| RetrievedHit {
                    passage_index: h.passage.index,
                    score: h.score,
                })
                .collect(),
        })
    }
}

impl<P: LlmProvider> std::fmt::Debug for Retriever<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use rulebook_llm::mock::MockProvider;

    use super::*;
    use crate::splitter::split;

    async fn build(provider: &MockProvider, text: &str) -> EmbeddingIndex {
        let passages = split(text, 40, 0).unwrap();
        EmbeddingIndex::build(provider, passages, 16).await.unwrap()
    }

    #[test]
    fn default_top_k_is_four() {
        assert_eq!(RetrievalConfig::default().top_k, 4);
    }

    #[test]
    fn format_joins_with_blank_line() {
        let a = crate::document::Passage {
            index: 0,
            start: 0,
            end: 3,
            text: "one".into(),
        };
        let b = crate::document::Passage {
            index: 1,
            start: 3,
            end: 6,
            text: "two".into(),
        };
        let hits = [
            ScoredPassage {
                passage: &b,
                score: 0.9,
            },
            ScoredPassage {
                passage: &a,
                score: 0.5,
            },
        ];
        assert_eq!(format_as_context(&hits), "two\n\none");
        assert_eq!(format_as_context(&[]), "");
    }

    #[tokio::test]
    async fn retrieve_returns_min_k_n_in_rank_order() {
        let provider = Arc::new(MockProvider::default());
        let index = build(
            &provider,
            "Kickoff happens at midfield.\n\nOffside penalty is five yards.\n\nTimeouts last two minutes.",
        )
        .await;
        let n = index.len();
        let retriever = Retriever::new(Arc::clone(&provider), RetrievalConfig { top_k: 10 });

        let ctx = retriever.retrieve(&index, "offside penalty").await.unwrap();
        assert_eq!(ctx.hits.len(), n.min(10));
        assert!(ctx.hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(ctx.text.starts_with("Offside penalty is five yards."));

        let ctx = retriever.retrieve_top(&index, "offside", 1).await.unwrap();
        assert_eq!(ctx.hits.len(), 1);
        assert!(!ctx.text.contains(CONTEXT_SEPARATOR));
    }

    #[tokio::test]
    async fn empty_index_gives_empty_context() {
        let provider = Arc::new(MockProvider::default());
        let index = EmbeddingIndex::build(provider.as_ref(), Vec::new(), 4)
            .await
            .unwrap();
        let retriever = Retriever::new(Arc::clone(&provider), RetrievalConfig::default());

        let ctx = retriever.retrieve(&index, "anything").await.unwrap();
        assert!(ctx.is_empty());
        assert!(ctx.text.is_empty());
        assert_eq!(provider.embed_calls(), 0);
    }

    #[tokio::test]
    async fn embedding_failure_propagates() {
        let provider = Arc::new(MockProvider::default());
        let index = build(&provider, "Some rule text here.").await;
        provider.set_fail_embed(true);

        let retriever = Retriever::new(Arc::clone(&provider), RetrievalConfig::default());
        let err = retriever.retrieve(&index, "rule").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::EmbeddingService);
    }
}
