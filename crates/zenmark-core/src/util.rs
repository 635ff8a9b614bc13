//! Small helpers shared by config, the remote client and the managers.

const MAX_ERROR_BODY_CHARS: usize = 180;

/// Trimmed text, or `None` when absent or blank.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(ToOwned::to_owned)
}

pub fn is_http_url(value: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| value.starts_with(scheme))
}

/// Response body shortened for inclusion in an error message.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(MAX_ERROR_BODY_CHARS).collect()
}

/// Wall clock as Unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Next last-modified value for a record last modified at `previous`.
///
/// Strictly greater than `previous` even when the wall clock has not moved
/// or went backwards.
pub fn next_modified(previous: i64) -> i64 {
    now_millis().max(previous.saturating_add(1))
}
