//! Builders for test fixtures.

#![allow(dead_code)]

use chrono::{DateTime, Utc};

use clipcast::gallery::Artifact;
use clipcast::targets::NewTarget;

use super::harness::at;

/// Builder for artifact metadata objects.
pub struct ArtifactBuilder {
    artifact: Artifact,
}

impl ArtifactBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            artifact: Artifact {
                id: id.to_string(),
                script: Some(format!("Script for {id}")),
                title: Some(format!("Title {id}")),
                category: Some("Gadgets".to_string()),
                affiliate_link: None,
                public_url: format!("store:media/{id}.mp4"),
                thumbnail_url: None,
                original_url: None,
                duration_seconds: 20.0,
                created_at: at(2026, 2, 1, 0, 0),
                origin_chat_id: None,
            },
        }
    }

    pub fn title(mut self, title: Option<&str>) -> Self {
        self.artifact.title = title.map(str::to_string);
        self
    }

    pub fn link(mut self, link: &str) -> Self {
        self.artifact.affiliate_link = Some(link.to_string());
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.artifact.created_at = at;
        self
    }

    pub fn build(self) -> Artifact {
        self.artifact
    }
}

/// Builder for target registrations.
pub struct TargetBuilder {
    target: NewTarget,
}

impl TargetBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            target: NewTarget {
                id: id.to_string(),
                display_name: format!("Page {id}"),
                credential: format!("token-{id}"),
                ..NewTarget::default()
            },
        }
    }

    pub fn slots(mut self, spec: &str) -> Self {
        self.target.slots = spec.to_string();
        self
    }

    pub fn timezone(mut self, tz: &str) -> Self {
        self.target.timezone = Some(tz.to_string());
        self
    }

    pub fn comment_credential(mut self, credential: &str) -> Self {
        self.target.comment_credential = Some(credential.to_string());
        self
    }

    pub fn build(self) -> NewTarget {
        self.target
    }
}
