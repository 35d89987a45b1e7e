/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Normalize an email address for storage and lookup.
///
/// Emails are unique case-insensitively, so every path that writes or
/// queries an email goes through this first.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
