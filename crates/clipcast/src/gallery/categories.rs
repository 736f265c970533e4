//! The category list offered to the script generator.
//!
//! Defaults come from the config. A tenant can replace them at runtime; the
//! replacement is stored as one object and wins until it is reset.

use std::sync::Arc;

use crate::error::{ClipcastError, Result};
use crate::store::{keys, TenantStore};

#[derive(Clone)]
pub struct CategoryList {
    store: TenantStore,
    defaults: Arc<Vec<String>>,
}

impl CategoryList {
    pub fn new(store: TenantStore, defaults: Vec<String>) -> Self {
        Self {
            store,
            defaults: Arc::new(defaults),
        }
    }

    pub fn defaults(&self) -> &[String] {
        &self.defaults
    }

    /// The stored override, or the defaults when none is stored.
    pub async fn get(&self) -> Result<Vec<String>> {
        match self.store.get_json::<Vec<String>>(keys::CATEGORIES).await? {
            Some(categories) => Ok(categories),
            None => Ok(self.defaults.to_vec()),
        }
    }

    /// Like [`get`](Self::get), but an unreadable override falls back to the
    /// defaults.
    pub async fn current(&self) -> Vec<String> {
        match self.get().await {
            Ok(categories) => categories,
            Err(e) => {
                log::warn!("Using default categories: {}", e);
                self.defaults.to_vec()
            }
        }
    }

    /// Stores a new list. Entries are trimmed and deduplicated in order.
    pub async fn set(&self, categories: Vec<String>) -> Result<Vec<String>> {
        let categories = normalize(categories)?;
        self.store.put_json(keys::CATEGORIES, &categories).await?;
        log::info!("Category list replaced ({} entries)", categories.len());
        Ok(categories)
    }

    /// Drops the override. Returns whether one was stored.
    pub async fn reset(&self) -> Result<bool> {
        let existed = self.store.exists(keys::CATEGORIES).await?;
        self.store.delete(keys::CATEGORIES).await?;
        Ok(existed)
    }
}

fn normalize(categories: Vec<String>) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(categories.len());
    for category in categories {
        let category = category.trim();
        if !category.is_empty() && !out.iter().any(|c| c == category) {
            out.push(category.to_string());
        }
    }
    if out.is_empty() {
        return Err(ClipcastError::InvalidCategories(
            "at least one category is required".to_string(),
        ));
    }
    Ok(out)
}
