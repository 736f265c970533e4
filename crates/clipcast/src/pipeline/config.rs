use crate::config::Config;
use crate::retry::RetryPolicy;

/// Duration assumed when sizing the script, before the merged media
/// reports its real length.
pub const DEFAULT_DURATION_SECONDS: f64 = 15.0;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Source URLs containing any of these markers go through the resolver.
    pub resolver_hosts: Vec<String>,
    pub merge_retry: RetryPolicy,
    pub duration_hint_seconds: f64,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            resolver_hosts: config.resolver.hosts.clone(),
            merge_retry: RetryPolicy::from_merge_config(&config.merge),
            duration_hint_seconds: DEFAULT_DURATION_SECONDS,
        }
    }

    pub fn needs_resolution(&self, source_url: &str) -> bool {
        let url = source_url.to_ascii_lowercase();
        self.resolver_hosts
            .iter()
            .any(|host| !host.is_empty() && url.contains(&host.to_ascii_lowercase()))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolver_hosts: vec!["xhs".to_string(), "xiaohongshu".to_string()],
            merge_retry: RetryPolicy::default(),
            duration_hint_seconds: DEFAULT_DURATION_SECONDS,
        }
    }
}
