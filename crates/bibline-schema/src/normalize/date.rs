//! Publication dates with fallback chains.
//!
//! A record without a usable date is skipped; dates are never defaulted to
//! the current day or the epoch. Partial dates get month and day `01`.

use std::sync::LazyLock;

use bibline_core::Skip;
use chrono::NaiveDate;
use regex::Regex;

use super::truncate_chars;

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[12][0-9]{3}").expect("valid year regex"));

/// Remove quotes, newlines and tabs, then trim
fn clean(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '"' | '\n' | '\t'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// January 1st of the first plausible year (1000-2999) found in `raw`
pub fn from_year(raw: &str) -> Option<NaiveDate> {
    let cleaned = clean(raw);
    let year: i32 = YEAR.find(&cleaned)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, 1, 1)
}

/// Compact `YYYYMMDD`, looking at the first eight characters only
pub fn from_compact(raw: &str) -> Option<NaiveDate> {
    let cleaned = clean(raw);
    NaiveDate::parse_from_str(truncate_chars(&cleaned, 8), "%Y%m%d").ok()
}

/// Year field first, compact date field second.
pub fn year_or_compact(year: &str, date: &str) -> Result<NaiveDate, Skip> {
    from_year(year).or_else(|| from_compact(date)).ok_or_else(|| {
        Skip::new("no usable date").with_detail(format!("year={year:?} date={date:?}"))
    })
}

/// Date from `[year]`, `[year, month]` or `[year, month, day]` parts.
pub fn from_parts(parts: &[i64]) -> Option<NaiveDate> {
    let part = |i: usize| parts.get(i).map(|&v| u32::try_from(v).ok());
    let year = i32::try_from(*parts.first()?).ok()?;
    let month = part(1).unwrap_or(Some(1))?;
    let day = part(2).unwrap_or(Some(1))?;
    if parts.len() > 3 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Year from the first four characters, as in `2015-03-01T...` or `2015`.
pub fn from_year_prefix(raw: &str) -> Result<NaiveDate, Skip> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Skip::new("empty date"));
    }
    if raw.chars().count() < 4 {
        return Err(Skip::new("short date").with_detail(raw));
    }
    truncate_chars(raw, 4)
        .parse::<i32>()
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
        .ok_or_else(|| Skip::new("invalid date").with_detail(raw))
}
