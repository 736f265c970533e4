use std::sync::Arc;

use super::api::CaptionGenerator;
use crate::config::PublishingConfig;
use crate::gallery::Artifact;

/// Characters of the script used when no caption can be generated.
pub const SCRIPT_EXCERPT_CHARS: usize = 100;

/// Builds the post description for an artifact.
///
/// The body is the artifact title, else a caption generated from the script,
/// else the configured fallback. The hashtag line follows on its own line.
#[derive(Clone)]
pub struct CaptionBuilder {
    generator: Option<Arc<dyn CaptionGenerator>>,
    hashtags: String,
    fallback: String,
}

impl CaptionBuilder {
    pub fn new(generator: Option<Arc<dyn CaptionGenerator>>, config: &PublishingConfig) -> Self {
        Self {
            generator,
            hashtags: config.hashtags.clone(),
            fallback: config.fallback_caption.clone(),
        }
    }

    pub async fn build(&self, artifact: &Artifact) -> String {
        let body = self.body(artifact).await;
        let mut tags = self.hashtags.trim().to_string();
        if let Some(category) = artifact.category.as_deref().map(hashtag).filter(|c| !c.is_empty()) {
            if !tags.is_empty() {
                tags.push(' ');
            }
            tags.push('#');
            tags.push_str(&category);
        }
        if tags.is_empty() {
            body
        } else {
            format!("{body}\n{tags}")
        }
    }

    async fn body(&self, artifact: &Artifact) -> String {
        if let Some(title) = non_blank(artifact.title.as_deref()) {
            return title.to_string();
        }
        let Some(script) = non_blank(artifact.script.as_deref()) else {
            return self.fallback.clone();
        };

        if let Some(generator) = &self.generator {
            match generator.generate(script).await {
                Ok(caption) if !caption.trim().is_empty() => return caption.trim().to_string(),
                Ok(_) => log::debug!("Caption generator returned nothing for '{}'", artifact.id),
                Err(e) => log::warn!("Caption generation failed for '{}': {}", artifact.id, e),
            }
        }
        script.chars().take(SCRIPT_EXCERPT_CHARS).collect()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Hashtags cannot contain whitespace.
fn hashtag(category: &str) -> String {
    category.split_whitespace().collect()
}
