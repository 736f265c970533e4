use serde::{Deserialize, Serialize};

use crate::secrets::SecretSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_data_directory")]
    pub data_directory: String,
    /// Bot token whose identity scopes every stored object.
    #[serde(default)]
    pub tenant_token: SecretSource,
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub publishing: PublishingConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

fn default_data_directory() -> String {
    "~/.clipcast/data".to_string()
}

fn default_timezone() -> String {
    "Asia/Bangkok".to_string()
}

/// Fallback category for anything the script model cannot place.
pub const FALLBACK_CATEGORY: &str = "อื่นๆ";

fn default_categories() -> Vec<String> {
    [
        "เครื่องมือช่าง",
        "อาหาร",
        "เครื่องครัว",
        "ของใช้ในบ้าน",
        "เฟอร์นิเจอร์",
        "บิวตี้",
        "แฟชั่น",
        "อิเล็กทรอนิกส์",
        "สุขภาพ",
        "กีฬา",
        "สัตว์เลี้ยง",
        "ยานยนต์",
        FALLBACK_CATEGORY,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Maximum distance in minutes between now and a slot for the slot to fire.
    #[serde(default = "default_slot_tolerance_minutes")]
    pub slot_tolerance_minutes: u32,
}

fn default_tick_interval_secs() -> u64 {
    60
}

fn default_slot_tolerance_minutes() -> u32 {
    1
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            slot_tolerance_minutes: default_slot_tolerance_minutes(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentMode {
    /// Sleep for the delay, then comment, within the publish run.
    Inline,
    /// Persist the comment and let a later scheduler tick post it.
    Deferred,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishingConfig {
    #[serde(default = "default_graph_api_base")]
    pub graph_api_base: String,
    #[serde(default = "default_comment_delay_secs")]
    pub comment_delay_secs: u64,
    #[serde(default = "default_comment_mode")]
    pub comment_mode: CommentMode,
    /// `{link}` is replaced with the artifact's affiliate link.
    #[serde(default = "default_comment_template")]
    pub comment_template: String,
    #[serde(default = "default_hashtags")]
    pub hashtags: String,
    #[serde(default = "default_fallback_caption")]
    pub fallback_caption: String,
}

fn default_graph_api_base() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}

fn default_comment_delay_secs() -> u64 {
    10
}

fn default_comment_mode() -> CommentMode {
    CommentMode::Inline
}

fn default_comment_template() -> String {
    "📍Shopee : {link}".to_string()
}

fn default_hashtags() -> String {
    "#สินค้า #ของน่าใช้ #ช็อปปิ้งออนไลน์".to_string()
}

fn default_fallback_caption() -> String {
    "AI Dubbed Video".to_string()
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            graph_api_base: default_graph_api_base(),
            comment_delay_secs: default_comment_delay_secs(),
            comment_mode: default_comment_mode(),
            comment_template: default_comment_template(),
            hashtags: default_hashtags(),
            fallback_caption: default_fallback_caption(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default = "default_merge_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff before attempt `n + 1` is `n * backoff_step_secs`.
    #[serde(default = "default_backoff_step_secs")]
    pub backoff_step_secs: u64,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_merge_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_step_secs() -> u64 {
    5
}

fn default_sample_rate() -> u32 {
    24000
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            base_url: default_merge_base_url(),
            max_attempts: default_max_attempts(),
            backoff_step_secs: default_backoff_step_secs(),
            sample_rate: default_sample_rate(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Base URL of the resolver service. Resolution is skipped when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Source URLs containing any of these markers are resolved first.
    #[serde(default = "default_resolver_hosts")]
    pub hosts: Vec<String>,
}

fn default_resolver_hosts() -> Vec<String> {
    vec!["xhs".to_string(), "xiaohongshu".to_string()]
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            hosts: default_resolver_hosts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_tts_model")]
    pub tts_model: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_ai_api_key")]
    pub api_key: SecretSource,
}

fn default_ai_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_ai_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_tts_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_voice() -> String {
    "Puck".to_string()
}

fn default_ai_api_key() -> SecretSource {
    SecretSource::from_env_var("GOOGLE_API_KEY")
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: default_ai_base_url(),
            model: default_ai_model(),
            tts_model: default_tts_model(),
            voice: default_voice(),
            api_key: default_ai_api_key(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    /// Notifications are disabled when no token source is configured.
    #[serde(default)]
    pub bot_token: SecretSource,
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: default_telegram_api_base(),
            bot_token: SecretSource::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Public URL prefix under which tenant objects are served, e.g.
    /// `https://media.example.com`. The tenant-relative key is appended.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

impl MediaConfig {
    /// URL under which a tenant object can be fetched. Without a public base
    /// the object is addressed as `store:{key}` and read back from the store.
    pub fn public_url(&self, tenant: &str, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}/{}", base.trim_end_matches('/'), tenant, key),
            None => format!("{}{}", crate::store::keys::STORE_URL_SCHEME, key),
        }
    }
}
