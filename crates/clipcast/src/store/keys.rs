//! Object layout within a tenant namespace.

use chrono::NaiveDate;

pub const JOBS_PREFIX: &str = "jobs/";
pub const QUEUE_PREFIX: &str = "queue/";
pub const ARTIFACTS_PREFIX: &str = "artifacts/";
pub const MEDIA_PREFIX: &str = "media/";
pub const SLOT_CLAIMS_PREFIX: &str = "slot-claims/";
pub const PENDING_COMMENTS_PREFIX: &str = "pending-comments/";
pub const GALLERY_SNAPSHOT: &str = "gallery-snapshot.json";
/// Tenant override of the configured category list.
pub const CATEGORIES: &str = "settings/categories.json";

/// Scheme of URLs that address an object in the local tenant store.
pub const STORE_URL_SCHEME: &str = "store:";

/// Processing or failed job record.
pub fn job(id: &str) -> String {
    format!("{JOBS_PREFIX}{id}.json")
}

/// Queued job record.
pub fn queued_job(id: &str) -> String {
    format!("{QUEUE_PREFIX}{id}.json")
}

pub fn artifact(id: &str) -> String {
    format!("{ARTIFACTS_PREFIX}{id}.json")
}

pub fn media(id: &str) -> String {
    format!("{MEDIA_PREFIX}{id}.mp4")
}

pub fn original_media(id: &str) -> String {
    format!("{MEDIA_PREFIX}{id}_original.mp4")
}

pub fn thumbnail(id: &str) -> String {
    format!("{MEDIA_PREFIX}{id}_thumb.webp")
}

pub fn slot_claim(target_id: &str, date: NaiveDate, hour: u32, minute: u32) -> String {
    format!(
        "{SLOT_CLAIMS_PREFIX}{target_id}/{}/{hour:02}_{minute:02}",
        date.format("%Y-%m-%d")
    )
}

pub fn pending_comment(external_post_id: &str) -> String {
    format!("{PENDING_COMMENTS_PREFIX}{external_post_id}.json")
}

/// Extracts `{id}` from `{prefix}{id}.json`.
pub fn id_from_json_key<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix)?
        .strip_suffix(".json")
        .filter(|id| !id.is_empty() && !id.contains('/'))
}

/// Returns the tenant-relative key of a `store:` URL.
pub fn key_from_store_url(url: &str) -> Option<&str> {
    url.strip_prefix(STORE_URL_SCHEME).filter(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_claim_key_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(
            slot_claim("page-1", date, 9, 5),
            "slot-claims/page-1/2026-03-01/09_05"
        );
    }

    #[test]
    fn test_key_from_store_url() {
        assert_eq!(key_from_store_url("store:media/a.mp4"), Some("media/a.mp4"));
        assert_eq!(key_from_store_url("https://cdn/a.mp4"), None);
        assert_eq!(key_from_store_url("store:"), None);
    }

    #[test]
    fn test_id_from_json_key() {
        assert_eq!(id_from_json_key("artifacts/ab12.json", ARTIFACTS_PREFIX), Some("ab12"));
        assert_eq!(id_from_json_key("artifacts/ab12.mp4", ARTIFACTS_PREFIX), None);
        assert_eq!(id_from_json_key("artifacts/x/ab12.json", ARTIFACTS_PREFIX), None);
        assert_eq!(id_from_json_key("jobs/ab12.json", ARTIFACTS_PREFIX), None);
    }
}
