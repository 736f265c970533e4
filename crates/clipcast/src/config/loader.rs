use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Returns the canonical config path: `~/.clipcast/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".clipcast").join("config.json"))
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(invalid(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    if config.data_directory.trim().is_empty() {
        return Err(invalid("data_directory cannot be empty"));
    }

    if config.default_timezone.parse::<chrono_tz::Tz>().is_err() {
        return Err(invalid(format!(
            "Unknown default_timezone '{}'",
            config.default_timezone
        )));
    }

    if config.categories.is_empty() {
        return Err(invalid("categories cannot be empty"));
    }

    if config.scheduler.tick_interval_secs == 0 {
        return Err(invalid("scheduler.tick_interval_secs must be at least 1"));
    }
    // A tolerance of 12 hours or more would match every slot of the day.
    if config.scheduler.slot_tolerance_minutes >= 12 * 60 {
        return Err(invalid(
            "scheduler.slot_tolerance_minutes must be below 720",
        ));
    }

    if config.merge.max_attempts == 0 {
        return Err(invalid("merge.max_attempts must be at least 1"));
    }
    if config.merge.sample_rate == 0 {
        return Err(invalid("merge.sample_rate must be positive"));
    }

    if !config.publishing.comment_template.contains("{link}") {
        return Err(invalid(
            "publishing.comment_template must contain '{link}'",
        ));
    }

    for (name, url) in [
        ("publishing.graph_api_base", Some(&config.publishing.graph_api_base)),
        ("merge.base_url", Some(&config.merge.base_url)),
        ("ai.base_url", Some(&config.ai.base_url)),
        ("telegram.api_base", Some(&config.telegram.api_base)),
        ("resolver.base_url", config.resolver.base_url.as_ref()),
        ("media.public_base_url", config.media.public_base_url.as_ref()),
    ] {
        if let Some(url) = url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid(format!("{name} must be an http(s) URL, got '{url}'")));
            }
        }
    }

    Ok(())
}
