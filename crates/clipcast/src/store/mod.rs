//! Blob storage shared by every tenant.
//!
//! A single [`BlobStore`] backend holds all objects; [`TenantStore`] scopes
//! each tenant to its own key prefix so that no tenant can see another's
//! objects.

pub mod blob;
pub mod filesystem;
pub mod keys;
pub mod tenant;

pub use blob::{BlobStore, MemoryBlobStore, ObjectMeta};
pub use filesystem::FsBlobStore;
pub use tenant::{tenant_from_token, TenantStore};

use crate::error::StoreError;

/// Validates a relative object key.
///
/// Keys are `/`-separated, relative, and may not contain traversal
/// segments, backslashes, or control characters.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(invalid_key(key, "key cannot be empty"));
    }
    if key.ends_with('/') {
        return Err(invalid_key(key, "key cannot end with '/'"));
    }
    validate_prefix(key)
}

/// Validates a list prefix. Same rules as [`validate_key`], except that an
/// empty prefix and a trailing `/` are allowed.
pub fn validate_prefix(prefix: &str) -> Result<(), StoreError> {
    if prefix.starts_with('/') {
        return Err(invalid_key(prefix, "absolute keys not allowed"));
    }
    if prefix.contains('\\') {
        return Err(invalid_key(prefix, "backslashes not allowed"));
    }
    if prefix.chars().any(char::is_control) {
        return Err(invalid_key(prefix, "control characters not allowed"));
    }

    let trimmed = prefix.strip_suffix('/').unwrap_or(prefix);
    if trimmed.is_empty() {
        return Ok(());
    }
    for segment in trimmed.split('/') {
        if segment.is_empty() {
            return Err(invalid_key(prefix, "empty path segment"));
        }
        if segment == "." || segment == ".." {
            return Err(invalid_key(prefix, "path traversal not allowed"));
        }
    }
    Ok(())
}

fn invalid_key(key: &str, reason: &str) -> StoreError {
    StoreError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
