//! Publishing artifacts to external targets.

pub mod api;
pub mod caption;
pub mod comments;
pub mod error;
pub mod pipeline;
pub mod titles;

pub use api::{CaptionGenerator, MediaFetcher, PublishingApi, UploadSession};
pub use caption::CaptionBuilder;
pub use comments::{render_comment, CommentSweep, PendingComment, PendingComments};
pub use error::PublishError;
pub use pipeline::{CommentOutcome, PublishOptions, PublishOutcome, PublishPipeline};
pub use titles::{BackfillReport, TitleBackfill};
