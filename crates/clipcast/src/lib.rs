pub mod clients;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod gallery;
pub mod ledger;
pub mod pipeline;
pub mod publish;
pub mod retry;
pub mod sanitize;
pub mod scheduler;
pub mod secrets;
pub mod store;
pub mod targets;

pub use config::{load_config, load_config_from_str, Config};
pub use dispatcher::{Dispatcher, Job, JobOutcome, JobQueue, JobStatus, PipelineRunner, SubmitOutcome};
pub use error::{ClipcastError, ConfigError, Result, StoreError};
pub use gallery::{Artifact, ArtifactEdit, ArtifactStore, CategoryList, Gallery, GallerySnapshot};
pub use ledger::{Ledger, PublishRecord, PublishStats, PublishStatus};
pub use pipeline::{DubbingPipeline, PipelineConfig};
pub use publish::{PublishError, PublishOptions, PublishOutcome, PublishPipeline};
pub use retry::{with_retry, RetryPolicy, Transient};
pub use scheduler::{Scheduler, Slot, TickReport};
pub use secrets::{SecretError, SecretSource};
pub use store::{BlobStore, FsBlobStore, MemoryBlobStore, TenantStore};
pub use targets::{NewTarget, Target, TargetRegistry};
