//! Compact duration text for `secondly` intervals.
//!
//! Rendering produces `1h30m`, `1h`, `1m30s`, `45s`; parsing accepts anything
//! [`humantime`] understands (`1h30m`, `90s`, `2h 5m`) and truncates to whole
//! seconds.

use std::fmt::Write;

/// Render a non-negative number of seconds as `XhYmZs`, omitting leading
/// zero components and trailing zero minutes/seconds.
#[must_use]
pub fn format_seconds(total: i64) -> String {
    debug_assert!(total >= 0, "negative duration {total}");
    let mut out = String::new();
    let total = total.unsigned_abs();
    let (hours, minutes, seconds) = (total / 3600, total / 60 % 60, total % 60);

    // infallible: writing to a String
    let _ = if hours > 0 {
        write!(out, "{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        write!(out, "{minutes}m{seconds}s")
    } else {
        write!(out, "{seconds}s")
    };

    if let Some(v) = out.strip_suffix("m0s") {
        out = format!("{v}m");
    }
    if let Some(v) = out.strip_suffix("h0m") {
        out = format!("{v}h");
    }
    out
}

/// Parse a duration string into whole seconds.
///
/// # Errors
///
/// Returns an error if `text` is not a valid duration.
pub fn parse_seconds(text: &str) -> Result<i64, humantime::DurationError> {
    let duration = humantime::parse_duration(text)?;
    Ok(i64::try_from(duration.as_secs()).unwrap_or(i64::MAX))
}
