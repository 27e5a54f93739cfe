use chrono::{DateTime, Utc};

/// Coarse age of an object created at `created`, as seen at `now`.
///
/// Negative elapsed time (clock skew between the API server and this
/// host) is clamped to zero.
pub fn format_age(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format_age_secs((now - created).num_seconds())
}

pub fn format_age_secs(total_secs: i64) -> String {
    let secs = total_secs.max(0);
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}
