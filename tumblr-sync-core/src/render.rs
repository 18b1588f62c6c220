//! Front matter rendering and file naming for Jekyll posts.

use std::fmt::Write;

use chrono::{DateTime, TimeZone};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Renders a Jekyll post: YAML front matter, a blank line, then the content.
///
/// The `tags:` block is only emitted when there are tags. The content always
/// ends with exactly one newline.
pub fn render<Tz>(content: &str, timestamp: &DateTime<Tz>, tags: &[String]) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::from("---\nlayout: post\n");
    if !tags.is_empty() {
        out.push_str("tags:\n");
        for tag in tags {
            // Writing to a String cannot fail.
            let _ = writeln!(out, "- {tag}");
        }
    }
    let _ = writeln!(out, "date: {}", timestamp.format("%Y-%m-%d %H:%M:%S %z"));
    out.push_str("---\n\n");
    out.push_str(content.trim_end_matches('\n'));
    out.push('\n');
    out
}

/// Filename stem for a post: the calendar date of `timestamp` followed by the
/// number of seconds since midnight UTC.
pub fn slug<Tz>(timestamp: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}-{}",
        timestamp.format("%Y-%m-%d"),
        timestamp.timestamp().rem_euclid(SECONDS_PER_DAY)
    )
}
