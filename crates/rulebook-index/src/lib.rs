//! Rulebook chunking, in-memory embedding index and build-once index lifecycle.

pub mod document;
pub mod error;
pub mod lifecycle;
pub mod retriever;
pub mod splitter;
pub mod store;

pub use document::{Document, Passage, TextLoader};
pub use error::{ErrorKind, IndexError};
pub use lifecycle::{IndexManager, IndexSettings};
pub use retriever::{RetrievalConfig, RetrievedContext, RetrievedHit, Retriever, format_as_context};
pub use splitter::{SplitterConfig, TextSplitter, split};
pub use store::{EmbeddingIndex, ScoredPassage};
