//! Lazy, build-once ownership of the process-wide embedding index.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, Shared};
use rulebook_llm::LlmProvider;

use crate::document::{DEFAULT_MAX_FILE_SIZE, TextLoader};
use crate::error::IndexError;
use crate::splitter::{SplitterConfig, TextSplitter};
use crate::store::{DEFAULT_EMBED_BATCH_SIZE, EmbeddingIndex};

pub type BuildResult = Result<Arc<EmbeddingIndex>, Arc<IndexError>>;

type SharedBuild = Shared<BoxFuture<'static, BuildResult>>;

/// Where the rulebook lives and how to turn it into an index.
#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub document_path: PathBuf,
    pub splitter: SplitterConfig,
    pub embed_batch_size: usize,
    pub max_file_size: u64,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            document_path: PathBuf::from("westin_rulebook.txt"),
            splitter: SplitterConfig::default(),
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[derive(Debug)]
struct IndexSource {
    document_path: PathBuf,
    loader: TextLoader,
    splitter: TextSplitter,
    embed_batch_size: usize,
}

impl IndexSource {
    async fn build<P: LlmProvider>(&self, provider: &P) -> Result<EmbeddingIndex, IndexError> {
        let document = self.loader.load(&self.document_path).await?;
        let passages = self.splitter.split(&document);
        EmbeddingIndex::build(provider, passages, self.embed_batch_size).await
    }
}

enum IndexState {
    Unbuilt,
    Building { generation: u64, build: SharedBuild },
    Built(Arc<EmbeddingIndex>),
}

/// Builds the index on first use and hands out the cached copy afterwards.
///
/// At most one build runs at a time. It runs on its own task and records its own
/// outcome, so a caller that gives up waiting never aborts it or leaves it pending. A
/// failed build leaves the manager unbuilt and the following call starts over.
pub struct IndexManager<P: LlmProvider + 'static> {
    provider: Arc<P>,
    source: Arc<IndexSource>,
    state: Arc<Mutex<IndexState>>,
    builds: AtomicU64,
}

impl<P: LlmProvider + 'static> IndexManager<P> {
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidSplitter`] for invalid chunking parameters.
    pub fn new(provider: Arc<P>, settings: IndexSettings) -> Result<Self, IndexError> {
        let splitter = TextSplitter::new(settings.splitter)?;
        Ok(Self {
            provider,
            source: Arc::new(IndexSource {
                document_path: settings.document_path,
                loader: TextLoader {
                    max_file_size: settings.max_file_size,
                },
                splitter,
                embed_batch_size: settings.embed_batch_size,
            }),
            state: Arc::new(Mutex::new(IndexState::Unbuilt)),
            builds: AtomicU64::new(0),
        })
    }

    /// Return the index, building it first if no build has succeeded yet.
    ///
    /// # Errors
    ///
    /// Returns the build error shared by every caller that waited on that build.
    pub async fn ensure_index(&self) -> BuildResult {
        let (generation, build) = {
            let mut state = lock(&self.state);
            match &*state {
                IndexState::Built(index) => return Ok(Arc::clone(index)),
                // A build whose task died without settling is not worth waiting on.
                IndexState::Building { generation, build }
                    if !matches!(build.peek(), Some(Err(_))) =>
                {
                    (*generation, build.clone())
                }
                IndexState::Building { .. } | IndexState::Unbuilt => {
                    let generation = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
                    let build = self.spawn_build(generation);
                    *state = IndexState::Building {
                        generation,
                        build: build.clone(),
                    };
                    (generation, build)
                }
            }
        };

        let result = build.await;
        settle(&self.state, generation, &result);
        result
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        matches!(*lock(&self.state), IndexState::Built(_))
    }

    /// Number of builds started so far.
    #[must_use]
    pub fn build_count(&self) -> u64 {
        self.builds.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn document_path(&self) -> &Path {
        &self.source.document_path
    }

    fn spawn_build(&self, generation: u64) -> SharedBuild {
        let provider = Arc::clone(&self.provider);
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            tracing::info!(
                generation,
                path = %source.document_path.display(),
                "building rulebook index"
            );
            let result = match source.build(provider.as_ref()).await {
                Ok(index) => {
                    tracing::info!(
                        generation,
                        passages = index.len(),
                        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                        "rulebook index ready"
                    );
                    Ok(Arc::new(index))
                }
                Err(e) => {
                    tracing::error!(generation, kind = e.kind().as_str(), "index build failed: {e}");
                    Err(Arc::new(e))
                }
            };
            settle(&state, generation, &result);
            result
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(Arc::new(IndexError::BuildAborted(e.to_string()))),
            }
        }
        .boxed()
        .shared()
    }
}

/// Record the outcome of `generation`, unless a later build already replaced it.
fn settle(state: &Mutex<IndexState>, generation: u64, result: &BuildResult) {
    let mut state = lock(state);
    if let IndexState::Building {
        generation: current,
        ..
    } = &*state
        && *current == generation
    {
        *state = match result {
            Ok(index) => IndexState::Built(Arc::clone(index)),
            Err(_) => IndexState::Unbuilt,
        };
    }
}

fn lock(state: &Mutex<IndexState>) -> MutexGuard<'_, IndexState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<P: LlmProvider + 'static> std::fmt::Debug for IndexManager<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("provider", &self.provider.name())
            .field("document_path", &self.source.document_path)
            .field("built", &self.is_built())
            .field("builds", &self.build_count())
            .finish()
    }
}
