pub mod extraction;
pub mod intake;
pub mod orchestrator;
pub mod queue;

pub use orchestrator::{Pipeline, PipelineError, ProcessOutcome};
pub use queue::{ExtractionQueue, QueueConfig};
