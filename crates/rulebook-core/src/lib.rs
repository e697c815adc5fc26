//! Configuration, grounded answering and the per-question pipeline.

pub mod answer;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod vault;

pub use answer::AnswerComposer;
pub use config::Config;
pub use error::{AnswerError, AskError};
pub use pipeline::AskPipeline;
