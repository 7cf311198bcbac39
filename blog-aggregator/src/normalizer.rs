//! Maps parsed feed items onto post candidates.

use crate::types::{NewPost, ParsedItem};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

/// A way of reading a publication date string.
#[derive(Debug, Clone, Copy)]
pub enum DateLayout {
    /// RFC 2822 / RFC 1123, numeric or named zone.
    Rfc2822,
    Rfc3339,
    /// A `chrono` format string that includes an offset (`%z`).
    WithOffset(&'static str),
    /// A format with no zone information, read as UTC.
    Utc(&'static str),
    /// A bare date, read as UTC midnight.
    DateOnly(&'static str),
}

impl DateLayout {
    fn parse(self, value: &str) -> Option<DateTime<Utc>> {
        match self {
            DateLayout::Rfc2822 => DateTime::parse_from_rfc2822(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            DateLayout::Rfc3339 => DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            DateLayout::WithOffset(format) => DateTime::parse_from_str(value, format)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            DateLayout::Utc(format) => NaiveDateTime::parse_from_str(value, format)
                .ok()
                .map(|naive| naive.and_utc()),
            DateLayout::DateOnly(format) => NaiveDate::parse_from_str(value, format)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc()),
        }
    }
}

/// Tried in order; the first layout that matches wins.
pub const PUBLISHED_AT_LAYOUTS: &[DateLayout] = &[
    DateLayout::Rfc2822,
    DateLayout::Rfc3339,
    DateLayout::WithOffset("%a, %d %b %Y %H:%M:%S %z"),
    DateLayout::WithOffset("%a, %e %b %Y %H:%M:%S %z"),
    DateLayout::WithOffset("%Y-%m-%dT%H:%M:%S%z"),
    DateLayout::WithOffset("%Y-%m-%d %H:%M:%S %z"),
    DateLayout::Utc("%a, %d %b %Y %H:%M:%S GMT"),
    DateLayout::Utc("%a, %d %b %Y %H:%M:%S UTC"),
    DateLayout::Utc("%a, %d %b %Y %H:%M:%S"),
    DateLayout::Utc("%A, %d %B %Y %H:%M:%S"),
    DateLayout::Utc("%Y-%m-%dT%H:%M:%S"),
    DateLayout::Utc("%Y-%m-%d %H:%M:%S"),
    DateLayout::DateOnly("%Y-%m-%d"),
];

/// Lenient publication date parsing. Anything unrecognised is `None`, never
/// an error.
pub fn parse_published_at(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;

    PUBLISHED_AT_LAYOUTS
        .iter()
        .find_map(|layout| layout.parse(value))
}

/// Builds a post candidate from an item. Items without a link are dropped.
pub fn normalize_item(feed_id: Uuid, item: &ParsedItem) -> Option<NewPost> {
    let url = item
        .link
        .as_deref()
        .map(str::trim)
        .filter(|link| !link.is_empty())?;

    let description = item
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(str::to_string);

    Some(NewPost {
        feed_id,
        title: item.title.clone().unwrap_or_default(),
        url: url.to_string(),
        description,
        published_at: parse_published_at(item.pub_date.as_deref()),
    })
}
