//! Where API keys and bot tokens come from.
//!
//! A [`SecretSource`] names up to three origins. The first one that is set
//! wins, in the order inline value, file, environment variable. Values read
//! from files or the environment are trimmed.

use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret configured")]
    Missing,

    #[error("Cannot read secret file '{path}': {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{0}' is not set")]
    EnvUnset(String),

    #[error("Environment variable '{0}' is not valid UTF-8")]
    EnvNotUnicode(String),
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Config fragment naming a secret's origin, e.g. `{"env": "BOT_TOKEN"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
}

enum Origin<'a> {
    Inline(&'a str),
    File(&'a str),
    Env(&'a str),
}

impl fmt::Display for Origin<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Inline(_) => f.write_str("inline value"),
            Origin::File(path) => write!(f, "file {path}"),
            Origin::Env(name) => write!(f, "${name}"),
        }
    }
}

impl SecretSource {
    pub fn from_env_var(name: &str) -> Self {
        Self {
            env: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        self.origin().is_some()
    }

    fn origin(&self) -> Option<Origin<'_>> {
        fn set(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.is_empty())
        }
        set(&self.value)
            .map(Origin::Inline)
            .or_else(|| set(&self.file).map(Origin::File))
            .or_else(|| set(&self.env).map(Origin::Env))
    }

    pub fn resolve(&self) -> Result<SecretString> {
        self.resolve_optional()?.ok_or(SecretError::Missing)
    }

    /// `Ok(None)` when no origin is configured; a configured origin that
    /// cannot be read is still an error.
    pub fn resolve_optional(&self) -> Result<Option<SecretString>> {
        let Some(origin) = self.origin() else {
            return Ok(None);
        };
        log::debug!("Resolving secret from {}", origin);
        let secret = match origin {
            Origin::Inline(value) => value.to_string(),
            Origin::File(path) => {
                let path = expand_home(path);
                std::fs::read_to_string(&path)
                    .map_err(|source| SecretError::File { path, source })?
                    .trim()
                    .to_string()
            }
            Origin::Env(name) => match std::env::var(name) {
                Ok(value) => value.trim().to_string(),
                Err(std::env::VarError::NotPresent) => {
                    return Err(SecretError::EnvUnset(name.to_string()))
                }
                Err(std::env::VarError::NotUnicode(_)) => {
                    return Err(SecretError::EnvNotUnicode(name.to_string()))
                }
            },
        };
        Ok(Some(SecretString::from(secret)))
    }
}

/// Replaces a leading `~` with the home directory. `~user` forms are left
/// alone.
pub fn expand_home(path: &str) -> String {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return path.to_string(),
    };
    match dirs::home_dir() {
        Some(home) => format!("{}{}", home.to_string_lossy(), rest),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use secrecy::ExposeSecret;
    use serial_test::serial;
    use tempfile::NamedTempFile;

    use super::*;

    fn source(value: Option<&str>, file: Option<&str>, env: Option<&str>) -> SecretSource {
        SecretSource {
            value: value.map(str::to_string),
            file: file.map(str::to_string),
            env: env.map(str::to_string),
        }
    }

    #[test]
    #[serial]
    fn test_inline_value_wins() {
        std::env::set_var("CLIPCAST_TEST_SECRET_1", "from-env");
        let secret = source(Some("inline"), None, Some("CLIPCAST_TEST_SECRET_1"))
            .resolve()
            .unwrap();
        assert_eq!(secret.expose_secret(), "inline");
        std::env::remove_var("CLIPCAST_TEST_SECRET_1");
    }

    #[test]
    #[serial]
    fn test_file_beats_env_and_is_trimmed() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  from-file  ").unwrap();
        std::env::set_var("CLIPCAST_TEST_SECRET_2", "from-env");

        let secret = source(Some(""), file.path().to_str(), Some("CLIPCAST_TEST_SECRET_2"))
            .resolve()
            .unwrap();

        assert_eq!(secret.expose_secret(), "from-file");
        std::env::remove_var("CLIPCAST_TEST_SECRET_2");
    }

    #[test]
    #[serial]
    fn test_env_fallback_is_trimmed() {
        std::env::set_var("CLIPCAST_TEST_SECRET_3", "from-env\n");
        let secret = SecretSource::from_env_var("CLIPCAST_TEST_SECRET_3").resolve().unwrap();
        assert_eq!(secret.expose_secret(), "from-env");
        std::env::remove_var("CLIPCAST_TEST_SECRET_3");
    }

    #[test]
    fn test_unconfigured_source() {
        let empty = SecretSource::default();
        assert!(!empty.is_configured());
        assert!(empty.resolve_optional().unwrap().is_none());
        assert!(matches!(empty.resolve(), Err(SecretError::Missing)));
    }

    #[test]
    fn test_configured_but_unreadable_is_an_error() {
        let missing_file = source(None, Some("/nonexistent/clipcast/secret"), None);
        assert!(matches!(missing_file.resolve_optional(), Err(SecretError::File { .. })));

        let unset = SecretSource::from_env_var("CLIPCAST_DEFINITELY_NOT_SET_12345");
        assert!(unset.is_configured());
        assert!(matches!(unset.resolve_optional(), Err(SecretError::EnvUnset(_))));
    }

    #[test]
    fn test_deserializes_partial_source() {
        let parsed: SecretSource = serde_json::from_str(r#"{"env": "BOT_TOKEN"}"#).unwrap();
        assert_eq!(parsed, SecretSource::from_env_var("BOT_TOKEN"));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), "/abs/path");
        assert_eq!(expand_home("rel/path"), "rel/path");
        assert_eq!(expand_home("~other/x"), "~other/x");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/data"), format!("{}/data", home.to_string_lossy()));
            assert_eq!(expand_home("~"), home.to_string_lossy());
        }
    }
}
