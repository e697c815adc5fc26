//! Wiring between the ask pipeline and the HTTP gateway.

pub mod ask;

pub use ask::PipelineHandler;
