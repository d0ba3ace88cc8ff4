use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Format of textual timestamps accepted for `UNIXTIME_MICROS` columns.
pub const TIMESTAMP_TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Only this many leading characters of a textual timestamp are parsed; fractional seconds
/// and zone suffixes are dropped.
const TIMESTAMP_TEXT_LEN: usize = 19;

/// Stored in place of zero or unparsable timestamps: `2099-11-11 11:11:11` UTC.
///
/// A bad date never blocks the pipeline; it is replaced by this marker instead.
pub fn sentinel_timestamp() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2099, 11, 11)
        .and_then(|date| date.and_hms_opt(11, 11, 11))
        .map(|datetime| datetime.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Parses a textual timestamp as UTC, falling back to [`sentinel_timestamp`].
///
/// The literal `"0"` and text that does not parse as `yyyy-MM-dd HH:mm:ss` after truncation
/// both yield the sentinel.
pub fn parse_timestamp_text(text: &str) -> DateTime<Utc> {
    if text == "0" {
        return sentinel_timestamp();
    }

    let truncated = match text.char_indices().nth(TIMESTAMP_TEXT_LEN) {
        Some((end, _)) => &text[..end],
        None => text,
    };

    NaiveDateTime::parse_from_str(truncated, TIMESTAMP_TEXT_FORMAT)
        .map(|datetime| datetime.and_utc())
        .unwrap_or_else(|_| sentinel_timestamp())
}

/// Microseconds since the Unix epoch for a textual timestamp.
pub fn timestamp_text_to_micros(text: &str) -> i64 {
    parse_timestamp_text(text).timestamp_micros()
}
