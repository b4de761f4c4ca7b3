//! Timestamp formatting utilities
//!
//! Time-valued attributes are rendered as RFC 3339 with exactly three
//! fractional digits (`2000-01-02T03:04:05.000Z`). A fixed width keeps the
//! lexical order of the rendered strings equal to their chronological order.

use chrono::{DateTime, FixedOffset, Offset, TimeZone};
use std::fmt::Write;

/// Length of `2006-01-02T15:04:05.000+07:00`
const RFC3339_MILLIS_MAX_LEN: usize = 29;

/// Format `t` as RFC 3339 with millisecond precision.
///
/// Sub-millisecond digits are truncated, never rounded, and a zero offset is
/// written as `Z`. The output is written into a single buffer sized for the
/// longest form.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use gcloud_log_handler::core::timestamp::format_rfc3339_millis;
///
/// let t = Utc.with_ymd_and_hms(2000, 1, 2, 3, 4, 5).unwrap();
/// assert_eq!(format_rfc3339_millis(&t), "2000-01-02T03:04:05.000Z");
/// ```
pub fn format_rfc3339_millis<Tz: TimeZone>(t: &DateTime<Tz>) -> String {
    let fixed: DateTime<FixedOffset> = t.with_timezone(&t.offset().fix());
    let mut buf = String::with_capacity(RFC3339_MILLIS_MAX_LEN);
    write_rfc3339_millis(&mut buf, &fixed);
    buf
}

fn write_rfc3339_millis(buf: &mut String, t: &DateTime<FixedOffset>) {
    // Writing into a String cannot fail.
    let _ = write!(buf, "{}", t.format("%Y-%m-%dT%H:%M:%S%.3f"));
    if t.offset().local_minus_utc() == 0 {
        buf.push('Z');
    } else {
        let _ = write!(buf, "{}", t.format("%:z"));
    }
}
