//! Single-flight job dispatcher.
//!
//! At most one pipeline run is in flight per tenant. Submissions that arrive
//! while one is running wait in a FIFO queue and are promoted as runs finish.

pub mod job;
pub mod queue;
pub mod single_flight;

pub use job::{new_job_id, Job, JobStatus};
pub use queue::JobQueue;
pub use single_flight::{Dispatcher, JobOutcome, PipelineRunner, SubmitOutcome};
