use thiserror::Error;

use crate::clients::HttpError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Media resolution failed: {0}")]
    Resolve(#[source] HttpError),

    #[error("No media found at {0}")]
    NothingResolved(String),

    #[error("Media download failed: {0}")]
    Download(#[source] HttpError),

    #[error("Script generation failed: {0}")]
    Script(#[source] HttpError),

    #[error("Script generation returned an empty script")]
    EmptyScript,

    #[error("Voice synthesis failed: {0}")]
    Voice(#[source] HttpError),

    #[error("Merge failed: {0}")]
    Merge(#[source] HttpError),

    #[error("Step '{0}' finished without producing its output")]
    Incomplete(&'static str),

    #[error("Merge output is not valid base64: {0}")]
    InvalidMergeOutput(#[from] base64::DecodeError),
}
