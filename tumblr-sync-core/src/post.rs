//! Post shapes as returned by the blog API (`filter=raw`).
//!
//! Only the fields the bridge reads are modelled; unknown fields are ignored
//! by serde. Post kinds the bridge does not know about deserialize into
//! [`SourcePost::Unsupported`] so a new kind on the API side never breaks a run.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use serde::Deserialize;
use thiserror::Error;

/// Layout of the `date` field on every post, minus the trailing zone name.
const POST_DATE_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// A post from the source feed. Only [`SourcePost::Text`] is published.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourcePost {
    Link(LinkPost),
    Photo(PhotoPost),
    Quote(QuotePost),
    Text(TextPost),
    #[serde(other)]
    Unsupported,
}

impl SourcePost {
    pub fn kind(&self) -> &'static str {
        match self {
            SourcePost::Link(_) => "link",
            SourcePost::Photo(_) => "photo",
            SourcePost::Quote(_) => "quote",
            SourcePost::Text(_) => "text",
            SourcePost::Unsupported => "unsupported",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkPost {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoPost {
    pub id: u64,
    #[serde(default)]
    pub image_permalink: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuotePost {
    pub id: u64,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextPost {
    pub id: u64,
    /// Publication time, e.g. `2019-01-04 21:34:46 GMT`.
    pub date: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub format: ContentFormat,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub trail: Vec<TrailEntry>,
}

impl TextPost {
    /// Raw content of the post: the first trail entry, or the body when the
    /// trail is empty.
    pub fn raw_content(&self) -> &str {
        self.trail
            .first()
            .map(|t| t.content_raw.as_str())
            .filter(|c| !c.is_empty())
            .unwrap_or(self.body.as_str())
    }

    pub fn published_at(&self) -> Result<DateTime<FixedOffset>, PostError> {
        parse_post_date(&self.date)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrailEntry {
    #[serde(default)]
    pub content_raw: String,
}

/// Declared format of a post's raw content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    #[default]
    Html,
    Markdown,
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error("unparseable post date {date:?}: {reason}")]
    InvalidDate { date: String, reason: String },
}

/// Parses a post date of the form `YYYY-MM-DD HH:MM:SS ZONE`.
///
/// `ZONE` is `GMT`, `UTC`, `Z` or a numeric offset (`+0100`, `-05:00`).
pub fn parse_post_date(date: &str) -> Result<DateTime<FixedOffset>, PostError> {
    let invalid = |reason: &str| PostError::InvalidDate {
        date: date.to_string(),
        reason: reason.to_string(),
    };

    let (local, zone) = date
        .trim()
        .rsplit_once(' ')
        .ok_or_else(|| invalid("missing time zone"))?;
    let naive = NaiveDateTime::parse_from_str(local, POST_DATE_LAYOUT)
        .map_err(|e| invalid(&e.to_string()))?;
    let offset = zone_offset(zone).ok_or_else(|| invalid("unknown time zone"))?;

    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| invalid("ambiguous local time"))
}

fn zone_offset(zone: &str) -> Option<FixedOffset> {
    match zone {
        "GMT" | "UTC" | "Z" => FixedOffset::east_opt(0),
        numeric => {
            let digits = numeric.replace(':', "");
            let (sign, rest) = match digits.as_bytes().first()? {
                b'+' => (1, &digits[1..]),
                b'-' => (-1, &digits[1..]),
                _ => return None,
            };
            if rest.len() != 4 || !rest.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let hours: i32 = rest[..2].parse().ok()?;
            let minutes: i32 = rest[2..].parse().ok()?;
            FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        }
    }
}
