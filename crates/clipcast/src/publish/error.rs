use thiserror::Error;

use crate::clients::HttpError;

/// A failed publish phase. The message carries the upstream error text.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("start: {0}")]
    Start(#[source] HttpError),

    #[error("fetch media: {0}")]
    Fetch(#[source] HttpError),

    #[error("upload: {0}")]
    Upload(#[source] HttpError),

    #[error("finish: {0}")]
    Finish(#[source] HttpError),

    #[error("Publish record {0} not found")]
    RecordNotFound(i64),
}

impl PublishError {
    /// Name of the phase that failed.
    pub fn phase(&self) -> &'static str {
        match self {
            PublishError::Start(_) => "start",
            PublishError::Fetch(_) => "fetch",
            PublishError::Upload(_) => "upload",
            PublishError::Finish(_) => "finish",
            PublishError::RecordNotFound(_) => "lookup",
        }
    }
}
