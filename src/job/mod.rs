//! Job Orchestrator: job state, persistence and the staged pipeline.

/// Worker pool, queue and cancellation.
pub mod orchestrator;
/// Stage driver for one job.
pub mod pipeline;
/// Stage machine and status reports.
pub mod state;
/// Audio source and video sink.
pub mod storage;
/// Job state persistence.
pub mod store;

pub use orchestrator::{JobRunner, Orchestrator};
pub use pipeline::{EncoderPermits, PipelineContext, run_job};
pub use state::{JobStage, JobStatusReport, RenderJob};
pub use storage::{ArtifactStorage, LocalStorage};
pub use store::{FileJobStore, JobStore, MemoryJobStore};
