use async_trait::async_trait;

use crate::clients::HttpError;

/// Turns a share link into a direct media URL.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// `None` when the page carries no media.
    async fn resolve(&self, source_url: &str) -> Result<Option<String>, HttpError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutput {
    pub media_base64: String,
    pub thumbnail_base64: Option<String>,
    pub duration_seconds: f64,
}

/// Lays a voice-over track onto the source media.
#[async_trait]
pub trait MergeService: Send + Sync {
    async fn merge(&self, media_url: &str, audio_base64: &str) -> Result<MergeOutput, HttpError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedScript {
    pub script: String,
    pub title: String,
    pub category: String,
}

/// A generated script and how it was read from the model's reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    /// The reply was the requested JSON document.
    Structured(GeneratedScript),
    /// The reply was not valid JSON; fields were pulled from the raw text.
    RawTextFallback(GeneratedScript),
}

impl ScriptOutcome {
    pub fn script(&self) -> &GeneratedScript {
        match self {
            ScriptOutcome::Structured(s) | ScriptOutcome::RawTextFallback(s) => s,
        }
    }

    pub fn into_script(self) -> GeneratedScript {
        match self {
            ScriptOutcome::Structured(s) | ScriptOutcome::RawTextFallback(s) => s,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ScriptOutcome::RawTextFallback(_))
    }
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_script(&self, media_url: &str, duration_seconds: f64) -> Result<ScriptOutcome, HttpError>;

    /// Returns base64 encoded PCM audio.
    async fn synthesize_voice(&self, script: &str) -> Result<String, HttpError>;
}

/// Best-effort chat notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, chat_id: i64, text: &str) -> Result<(), HttpError>;
}

/// Notifier used when no chat transport is configured.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _chat_id: i64, _text: &str) -> Result<(), HttpError> {
        Ok(())
    }
}
