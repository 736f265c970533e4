//! Generated titles for artifacts that were stored without one.

use std::sync::Arc;

use serde::Serialize;

use super::api::CaptionGenerator;
use crate::clients::HttpError;
use crate::error::{ClipcastError, Result};
use crate::gallery::{Artifact, ArtifactEdit, ArtifactStore};

/// Characters of the script sent to the generator.
pub const TITLE_SCRIPT_CHARS: usize = 300;

#[derive(Debug, Default, Serialize)]
pub struct BackfillReport {
    pub titled: Vec<TitledArtifact>,
    pub failed: Vec<FailedTitle>,
}

#[derive(Debug, Serialize)]
pub struct TitledArtifact {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct FailedTitle {
    pub id: String,
    pub error: String,
}

#[derive(Clone)]
pub struct TitleBackfill {
    artifacts: ArtifactStore,
    generator: Arc<dyn CaptionGenerator>,
}

impl TitleBackfill {
    pub fn new(artifacts: ArtifactStore, generator: Arc<dyn CaptionGenerator>) -> Self {
        Self { artifacts, generator }
    }

    /// Generates and stores a title for one artifact, replacing any title it
    /// already has. The gallery entry is refreshed.
    pub async fn generate(&self, id: &str) -> Result<Artifact> {
        let artifact = self.artifacts.require(id).await?;
        let script = artifact
            .script
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ClipcastError::MissingScript(id.to_string()))?;
        let excerpt: String = script.chars().take(TITLE_SCRIPT_CHARS).collect();

        let title = clean_title(&self.generator.generate(&excerpt).await?);
        if title.is_empty() {
            return Err(HttpError::Decode("no title generated".to_string()).into());
        }

        let artifact = self
            .artifacts
            .edit(
                id,
                ArtifactEdit {
                    title: Some(title),
                    ..ArtifactEdit::default()
                },
            )
            .await?;
        log::info!("Generated title for artifact {}", id);
        Ok(artifact)
    }

    /// Titles every untitled artifact. One failure does not stop the rest.
    pub async fn generate_pending(&self) -> Result<BackfillReport> {
        let mut report = BackfillReport::default();
        for artifact in self.artifacts.untitled().await? {
            match self.generate(&artifact.id).await {
                Ok(titled) => report.titled.push(TitledArtifact {
                    id: titled.id,
                    title: titled.title.unwrap_or_default(),
                }),
                Err(e) => {
                    log::warn!("Title generation failed for {}: {}", artifact.id, e);
                    report.failed.push(FailedTitle {
                        id: artifact.id,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }
}

/// First non-empty line with one pair of surrounding quotes removed.
fn clean_title(raw: &str) -> String {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    for (open, close) in [('"', '"'), ('\u{201c}', '\u{201d}')] {
        if let Some(inner) = line.strip_prefix(open).and_then(|l| l.strip_suffix(close)) {
            return inner.trim().to_string();
        }
    }
    line.to_string()
}
