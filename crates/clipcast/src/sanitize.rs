//! Helpers for keeping credentials out of logs, span fields and stored
//! error messages.

/// Maximum length of an error message persisted on a job record.
pub const MAX_ERROR_LEN: usize = 200;

/// Shows only the first four characters of a credential.
///
/// - `EAAGm0PX4ZCps...` → `EAAG****`
/// - `abc` → `****`
pub fn redact_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 8 {
        return "****".to_string();
    }
    format!("{}****", visible)
}

/// Drops the query string from a URL, where access tokens usually travel.
///
/// - `https://rupload.example.com/v/1?access_token=x` → `https://rupload.example.com/v/1`
pub fn redact_url_query(url: &str) -> String {
    match url.find(|c: char| c == '?' || c == '#') {
        Some(pos) => url[..pos].to_string(),
        None => url.to_string(),
    }
}

/// Truncates a message to at most `max` characters on a char boundary.
pub fn truncate_message(message: &str, max: usize) -> String {
    match message.char_indices().nth(max) {
        Some((idx, _)) => message[..idx].to_string(),
        None => message.to_string(),
    }
}
