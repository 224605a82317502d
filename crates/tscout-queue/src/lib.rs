//! Redis Streams job queue.
//!
//! This crate provides:
//! - Typed job payloads for every pipeline kind
//! - Enqueueing with idempotency keys
//! - Worker consumption with retry counters, crash recovery and a DLQ

pub mod error;
pub mod job;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job::{
    AnalyzeCompetitorsJob, CreateProjectJob, DiscoverChannelsJob, FinalizeCompetitorsJob,
    GeneratePlotJob, GenerateScriptJob, GenerateThumbnailsJob, PrepareResourcesJob, QueueJob,
};
pub use queue::{JobQueue, QueueConfig};
