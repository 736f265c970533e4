use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("HTTP error: {0}")]
    Http(#[from] crate::clients::HttpError),

    #[error("Publish error: {0}")]
    Publish(#[from] crate::publish::PublishError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),

    #[error("Failed to encode output: {0}")]
    Output(#[source] serde_json::Error),

    #[error("Target '{0}' not found")]
    TargetNotFound(String),

    #[error("Artifact '{0}' not found")]
    ArtifactNotFound(String),

    #[error("Invalid slot specification '{spec}': {reason}")]
    InvalidSlot { spec: String, reason: String },

    #[error("Unknown time zone '{0}'")]
    InvalidTimezone(String),

    #[error("Invalid category list: {0}")]
    InvalidCategories(String),

    #[error("Artifact '{0}' has no script to title from")]
    MissingScript(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Invalid tenant '{tenant}': {reason}")]
    InvalidTenant { tenant: String, reason: String },

    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode object '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode object '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, ClipcastError>;
