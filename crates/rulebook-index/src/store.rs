use std::cmp::Ordering;
use std::time::Instant;

use rulebook_llm::LlmProvider;

use crate::document::Passage;
use crate::error::IndexError;

/// Passages sent per `embed_batch` call when none is configured.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 64;

/// A passage and its cosine similarity to a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPassage<'a> {
    pub passage: &'a Passage,
    pub score: f32,
}

/// Immutable in-memory vector index over the rulebook passages.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingIndex {
    passages: Vec<Passage>,
    vectors: Vec<Vec<f32>>,
    norms: Vec<f32>,
    dimensions: usize,
}

impl EmbeddingIndex {
    /// Embed every passage and build the index.
    ///
    /// Nothing is returned unless every passage received a well-formed vector.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Embedding`] when the provider fails and
    /// [`IndexError::MalformedEmbedding`] for a wrong vector count, an empty vector,
    /// non-finite components or inconsistent dimensions.
    pub async fn build<P: LlmProvider>(
        provider: &P,
        passages: Vec<Passage>,
        batch_size: usize,
    ) -> Result<Self, IndexError> {
        let started = Instant::now();
        let mut vectors = Vec::with_capacity(passages.len());
        let mut dimensions = 0;

        for batch in passages.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
            let embedded = provider.embed_batch(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(IndexError::MalformedEmbedding(format!(
                    "requested {} embeddings, received {}",
                    texts.len(),
                    embedded.len()
                )));
            }

            for vector in embedded {
                check_vector(&vector)?;
                if dimensions == 0 {
                    dimensions = vector.len();
                } else if vector.len() != dimensions {
                    return Err(IndexError::MalformedEmbedding(format!(
                        "inconsistent dimensions: {dimensions} and {}",
                        vector.len()
                    )));
                }
                vectors.push(vector);
            }
        }

        let norms = vectors.iter().map(|v| norm(v)).collect();
        tracing::info!(
            passages = passages.len(),
            dimensions,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "embedding index built"
        );

        Ok(Self {
            passages,
            vectors,
            norms,
            dimensions,
        })
    }

    /// Embed `query_text` and return the `k` most similar passages.
    ///
    /// An empty index answers without calling the provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the query embedding fails or has the wrong dimension.
    pub async fn query<P: LlmProvider>(
        &self,
        provider: &P,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<ScoredPassage<'_>>, IndexError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let vector = provider.embed(query_text).await?;
        check_vector(&vector)?;
        self.search(&vector, k)
    }

    /// Return the `min(k, len)` passages closest to `vector`, best first.
    ///
    /// Equal scores keep document order.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] if `vector` does not match the index.
    pub fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredPassage<'_>>, IndexError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if vector.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }

        let query_norm = norm(vector);
        let mut scored: Vec<ScoredPassage<'_>> = self
            .passages
            .iter()
            .zip(&self.vectors)
            .zip(&self.norms)
            .map(|((passage, v), &n)| ScoredPassage {
                passage,
                score: cosine_similarity(vector, query_norm, v, n),
            })
            .collect();

        scored.sort_by(|a, b| match b.score.total_cmp(&a.score) {
            Ordering::Equal => a.passage.index.cmp(&b.passage.index),
            other => other,
        });
        scored.truncate(k);
        Ok(scored)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Vector dimension, 0 for an empty index.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[must_use]
    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }
}

fn check_vector(vector: &[f32]) -> Result<(), IndexError> {
    if vector.is_empty() {
        return Err(IndexError::MalformedEmbedding("empty vector".into()));
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(IndexError::MalformedEmbedding(
            "vector has non-finite components".into(),
        ));
    }
    Ok(())
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine_similarity(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (norm_a * norm_b)
}
