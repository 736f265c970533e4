use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::http::{error_for_status, read_json, HttpError, TRANSFER_TIMEOUT};
use crate::config::{AiConfig, FALLBACK_CATEGORY};
use crate::gallery::CategoryList;
use crate::pipeline::services::{ContentGenerator, GeneratedScript, ScriptOutcome};
use crate::publish::api::{CaptionGenerator, MediaFetcher};

static RE_SCRIPT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""thai_script"\s*:\s*"([^"]+)""#).unwrap());
static RE_TITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""title"\s*:\s*"([^"]+)""#).unwrap());
static RE_CATEGORY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""category"\s*:\s*"([^"]+)""#).unwrap());

/// Characters kept from an unparseable script response.
const RAW_SCRIPT_CHARS: usize = 500;
const FILE_POLL_INTERVAL: Duration = Duration::from_secs(2);
const FILE_POLL_ATTEMPTS: u32 = 30;

/// Gemini `generateContent` adapter for scripts, voice-over and captions.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    tts_model: String,
    voice: String,
    api_key: SecretString,
    categories: CategoryList,
    fetcher: Arc<dyn MediaFetcher>,
}

#[derive(Deserialize)]
struct UploadedFile {
    file: FileInfo,
}

#[derive(Deserialize)]
struct FileInfo {
    name: String,
    uri: String,
    #[serde(default)]
    state: Option<String>,
}

impl GeminiClient {
    pub fn new(
        http: reqwest::Client,
        config: &AiConfig,
        api_key: SecretString,
        categories: CategoryList,
        fetcher: Arc<dyn MediaFetcher>,
    ) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            tts_model: config.tts_model.clone(),
            voice: config.voice.clone(),
            api_key,
            categories,
            fetcher,
        }
    }

    /// `https://host/v1beta` becomes `https://host/upload/v1beta/files`.
    fn upload_url(&self) -> String {
        match self.base_url.rsplit_once('/') {
            Some((origin, version)) if !origin.ends_with(':') && !origin.ends_with('/') => {
                format!("{origin}/upload/{version}/files")
            }
            _ => format!("{}/upload/files", self.base_url),
        }
    }

    async fn generate_content(&self, model: &str, body: Value) -> Result<Value, HttpError> {
        let response = self
            .http
            .post(format!("{}/models/{}:generateContent", self.base_url, model))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .timeout(TRANSFER_TIMEOUT)
            .send()
            .await?;
        read_json(response).await
    }

    async fn upload_file(&self, media: Bytes) -> Result<FileInfo, HttpError> {
        let start = self
            .http
            .post(self.upload_url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", media.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", "video/mp4")
            .json(&json!({ "file": { "display_name": "video.mp4" } }))
            .send()
            .await?;
        let start = error_for_status(start).await?;
        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| HttpError::Decode("no upload URL in file upload response".to_string()))?;

        let response = self
            .http
            .post(upload_url)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", "0")
            .header("Content-Type", "video/mp4")
            .timeout(TRANSFER_TIMEOUT)
            .body(media)
            .send()
            .await?;
        let uploaded: UploadedFile = read_json(response).await?;
        Ok(uploaded.file)
    }

    async fn wait_until_active(&self, file: FileInfo) -> Result<String, HttpError> {
        if file.state.as_deref() != Some("PROCESSING") {
            return Ok(file.uri);
        }
        for _ in 0..FILE_POLL_ATTEMPTS {
            tokio::time::sleep(FILE_POLL_INTERVAL).await;
            let response = self
                .http
                .get(format!("{}/{}", self.base_url, file.name))
                .header("x-goog-api-key", self.api_key.expose_secret())
                .send()
                .await?;
            let info: FileInfo = read_json(response).await?;
            if info.state.as_deref() != Some("PROCESSING") {
                return Ok(info.uri);
            }
        }
        Err(HttpError::Timeout("uploaded media is still processing".to_string()))
    }

    fn script_prompt(duration_seconds: f64, categories: &[String]) -> String {
        let max_chars = ((duration_seconds * 10.0) as usize).min(800);
        let min_chars = ((duration_seconds * 7.0) as usize).max(80);
        format!(
            "Watch this product video and write a Thai voice-over script for a short vertical reel.\n\
             The video is {duration_seconds:.1} seconds long, so the script must be {min_chars}-{max_chars} characters.\n\
             Also write a one-line catchy caption and pick one category from: {categories}.\n\
             Reply with JSON only:\n\
             {{\"thai_script\": \"...\", \"title\": \"...\", \"category\": \"...\"}}",
            categories = categories.join(", "),
        )
    }
}

/// Text of the first candidate part, if any.
fn first_text(response: &Value) -> Option<&str> {
    response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
}

#[derive(Deserialize)]
struct ScriptJson {
    #[serde(default)]
    thai_script: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    category: String,
}

fn normalize_category(category: &str, categories: &[String]) -> String {
    if categories.iter().any(|c| c == category) {
        category.to_string()
    } else {
        FALLBACK_CATEGORY.to_string()
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|c| c[1].to_string())
}

/// Reads a script response: strict JSON first, then field-by-field
/// extraction from the raw text.
pub fn parse_script_response(text: &str, categories: &[String]) -> ScriptOutcome {
    let cleaned = text.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();

    if let Ok(parsed) = serde_json::from_str::<ScriptJson>(cleaned) {
        return ScriptOutcome::Structured(GeneratedScript {
            script: parsed.thai_script,
            title: parsed.title,
            category: normalize_category(&parsed.category, categories),
        });
    }

    let script =
        capture(&RE_SCRIPT, cleaned).unwrap_or_else(|| cleaned.chars().take(RAW_SCRIPT_CHARS).collect());
    let title = capture(&RE_TITLE, cleaned).unwrap_or_default();
    let category = capture(&RE_CATEGORY, cleaned)
        .map(|c| normalize_category(&c, categories))
        .unwrap_or_else(|| FALLBACK_CATEGORY.to_string());

    warn!(script_len = script.chars().count(), "Script response was not valid JSON; using raw text fallback");
    ScriptOutcome::RawTextFallback(GeneratedScript {
        script,
        title,
        category,
    })
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate_script(&self, media_url: &str, duration_seconds: f64) -> Result<ScriptOutcome, HttpError> {
        let media = self.fetcher.fetch(media_url).await?;
        let file = self.upload_file(media).await?;
        let file_uri = self.wait_until_active(file).await?;
        let categories = self.categories.current().await;

        let response = self
            .generate_content(
                &self.model,
                json!({
                    "contents": [{
                        "parts": [
                            { "fileData": { "mimeType": "video/mp4", "fileUri": file_uri } },
                            { "text": Self::script_prompt(duration_seconds, &categories) },
                        ]
                    }],
                    "generationConfig": { "temperature": 0.8, "maxOutputTokens": 4096 },
                }),
            )
            .await?;

        let text = first_text(&response).unwrap_or_default();
        debug!(response_len = text.len(), "Script response received");
        Ok(parse_script_response(text, &categories))
    }

    async fn synthesize_voice(&self, script: &str) -> Result<String, HttpError> {
        let response = self
            .generate_content(
                &self.tts_model,
                json!({
                    "contents": [{ "parts": [{ "text": script }] }],
                    "generationConfig": {
                        "responseModalities": ["AUDIO"],
                        "speechConfig": {
                            "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": self.voice } }
                        }
                    }
                }),
            )
            .await?;

        response
            .pointer("/candidates/0/content/parts/0/inlineData/data")
            .and_then(Value::as_str)
            .filter(|data| !data.is_empty())
            .map(str::to_string)
            .ok_or_else(|| HttpError::Decode("voice response carried no audio".to_string()))
    }
}

#[async_trait]
impl CaptionGenerator for GeminiClient {
    async fn generate(&self, script: &str) -> Result<String, HttpError> {
        let prompt = format!(
            "Write one short, catchy Thai caption (a single line, no hashtags) for a product reel with this voice-over:\n\n{script}"
        );
        let response = self
            .generate_content(
                &self.model,
                json!({
                    "contents": [{ "parts": [{ "text": prompt }] }],
                    "generationConfig": { "temperature": 0.9, "maxOutputTokens": 256 },
                }),
            )
            .await?;

        first_text(&response)
            .and_then(|text| text.lines().map(str::trim).find(|l| !l.is_empty()))
            .map(|line| line.trim_matches('"').to_string())
            .ok_or_else(|| HttpError::Decode("caption response carried no text".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> Vec<String> {
        vec!["อาหาร".to_string(), "บิวตี้".to_string(), FALLBACK_CATEGORY.to_string()]
    }

    #[test]
    fn test_parse_structured_json_in_fence() {
        let text = "```json\n{\"thai_script\": \"ของดีมาแล้ว\", \"title\": \"ต้องมี\", \"category\": \"อาหาร\"}\n```";
        let ScriptOutcome::Structured(script) = parse_script_response(text, &categories()) else {
            panic!("expected structured outcome");
        };
        assert_eq!(script.script, "ของดีมาแล้ว");
        assert_eq!(script.title, "ต้องมี");
        assert_eq!(script.category, "อาหาร");
    }

    #[test]
    fn test_unknown_category_falls_back() {
        let text = r#"{"thai_script": "x", "title": "y", "category": "ยานอวกาศ"}"#;
        let outcome = parse_script_response(text, &categories());
        assert_eq!(outcome.script().category, FALLBACK_CATEGORY);
    }

    #[test]
    fn test_truncated_json_uses_regex_fallback() {
        let text = r#"{"thai_script": "สคริปต์ยาว", "title": "หัวข้อ", "category": "บิวตี้", "#;
        let ScriptOutcome::RawTextFallback(script) = parse_script_response(text, &categories()) else {
            panic!("expected fallback outcome");
        };
        assert_eq!(script.script, "สคริปต์ยาว");
        assert_eq!(script.title, "หัวข้อ");
        assert_eq!(script.category, "บิวตี้");
    }

    #[test]
    fn test_plain_text_becomes_script() {
        let text = "ข้อความธรรมดา".repeat(100);
        let outcome = parse_script_response(&text, &categories());
        assert!(matches!(outcome, ScriptOutcome::RawTextFallback(_)));
        assert_eq!(outcome.script().script.chars().count(), RAW_SCRIPT_CHARS);
        assert_eq!(outcome.script().category, FALLBACK_CATEGORY);
    }

    #[test]
    fn test_script_prompt_lists_categories() {
        let prompt = GeminiClient::script_prompt(20.0, &categories());
        assert!(prompt.contains("อาหาร, บิวตี้"));
        assert!(prompt.contains("20.0 seconds"));
    }

    #[test]
    fn test_first_text_pointer() {
        let response = json!({ "candidates": [{ "content": { "parts": [{ "text": "hi" }] } }] });
        assert_eq!(first_text(&response), Some("hi"));
        assert_eq!(first_text(&json!({})), None);
    }
}
