use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate};
use regex::Regex;

static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

pub const UNKNOWN_DATE: &str = "unknown";

/// Converts a player name or id into the slug used by tree file names,
/// e.g. `"Nikola Vucevic"` becomes `"nikola-vucevic"`.
pub fn slugify(input: &str) -> String {
    match WHITESPACE.as_ref() {
        Some(re) => re.replace_all(input.trim(), "-").to_lowercase(),
        None => input.split_whitespace().collect::<Vec<_>>().join("-").to_lowercase(),
    }
}

/// Last segment of a slug (`"nikola-vucevic"` -> `"vucevic"`).
pub fn last_name_slug(slug: &str) -> &str {
    slug.rsplit('-').next().filter(|s| !s.is_empty()).unwrap_or(slug)
}

/// Parses the transaction dates found in tree files.
///
/// Accepts plain ISO dates and full RFC 3339 timestamps. Anything else is
/// treated as undated, which orders after every dated node.
pub fn parse_asset_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|timestamp| timestamp.date_naive())
}

pub fn year_of(raw: Option<&str>) -> Option<i32> {
    parse_asset_date(raw).map(|date| date.year())
}
