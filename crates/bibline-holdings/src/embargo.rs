//! Moving wall (embargo) delays.
//!
//! Delays are written as `-<n>M` or `-<n>Y`. A month counts 720 hours and a
//! year 8760 hours, without calendar arithmetic.

use std::sync::LazyLock;

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;

pub const HOURS_PER_MONTH: i64 = 720;
pub const HOURS_PER_YEAR: i64 = 8760;

static DELAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-(\d+)(M|Y)$").expect("valid delay regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbargoError {
    /// Not of the form `-<digits>M` or `-<digits>Y`
    UnknownFormat(String),
    /// Begin and end boundary carry different delays
    Mismatch { begin: TimeDelta, end: TimeDelta },
}

impl std::fmt::Display for EmbargoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownFormat(s) => write!(f, "unknown delay format: {s:?}"),
            Self::Mismatch { begin, end } => write!(
                f,
                "delay mismatch: begin {}h, end {}h",
                begin.num_hours(),
                end.num_hours()
            ),
        }
    }
}

impl std::error::Error for EmbargoError {}

/// Parse a delay expression into a non-positive duration.
pub fn parse_delay(s: &str) -> Result<TimeDelta, EmbargoError> {
    let unknown = || EmbargoError::UnknownFormat(s.to_string());
    let caps = DELAY.captures(s).ok_or_else(unknown)?;
    let value: i64 = caps[1].parse().map_err(|_| unknown())?;
    let per_unit = match &caps[2] {
        "M" => HOURS_PER_MONTH,
        _ => HOURS_PER_YEAR,
    };
    value
        .checked_mul(per_unit)
        .and_then(|hours| TimeDelta::try_hours(-hours))
        .ok_or_else(unknown)
}

/// Effective delay of an entitlement given its begin and end delay fields.
///
/// Either side may be absent; when both are present they must agree. No
/// delay at all is a zero duration.
pub fn resolve_delay(begin: Option<&str>, end: Option<&str>) -> Result<TimeDelta, EmbargoError> {
    match (begin, end) {
        (None, None) => Ok(TimeDelta::zero()),
        (Some(b), None) => parse_delay(b),
        (None, Some(e)) => parse_delay(e),
        (Some(b), Some(e)) => {
            let begin = parse_delay(b)?;
            let end = parse_delay(e)?;
            if begin != end {
                return Err(EmbargoError::Mismatch { begin, end });
            }
            Ok(begin)
        }
    }
}

/// Last instant before the moving wall, relative to `now`
pub fn boundary_at(now: DateTime<Utc>, delay: TimeDelta) -> DateTime<Utc> {
    now + delay
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(h: i64) -> TimeDelta {
        TimeDelta::try_hours(h).unwrap()
    }

    #[test]
    fn months_and_years() {
        assert_eq!(parse_delay("-0M"), Ok(TimeDelta::zero()));
        assert_eq!(parse_delay("-1M"), Ok(hours(-720)));
        assert_eq!(parse_delay("-2M"), Ok(hours(-1440)));
        assert_eq!(parse_delay("-1Y"), Ok(hours(-8760)));
        assert_eq!(parse_delay("-1M").unwrap().num_seconds(), -2_592_000);
    }

    #[test]
    fn unknown_formats() {
        for s in ["-1D", "-1", "129", "AB", "-111m", "0.1M", "0M", "", " -1M"] {
            assert!(
                matches!(parse_delay(s), Err(EmbargoError::UnknownFormat(_))),
                "{s:?}"
            );
        }
    }

    #[test]
    fn absurd_values_are_rejected() {
        assert!(parse_delay("-99999999999999999999Y").is_err());
        assert!(parse_delay("-9223372036854775807Y").is_err());
    }

    #[test]
    fn either_side_or_both() {
        assert_eq!(resolve_delay(Some("-1M"), None), Ok(hours(-720)));
        assert_eq!(resolve_delay(None, Some("-1M")), Ok(hours(-720)));
        assert_eq!(resolve_delay(Some("-1M"), Some("-1M")), Ok(hours(-720)));
        assert_eq!(resolve_delay(None, None), Ok(TimeDelta::zero()));
    }

    #[test]
    fn mismatch_in_both_directions() {
        for (b, e) in [("-1M", "-2M"), ("-2M", "-1M")] {
            assert!(matches!(
                resolve_delay(Some(b), Some(e)),
                Err(EmbargoError::Mismatch { .. })
            ));
        }
    }

    #[test]
    fn boundary_from_explicit_clock() {
        let now = DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let wall = boundary_at(now, parse_delay("-1Y").unwrap());
        assert_eq!(wall.to_rfc3339(), "2023-03-02T00:00:00+00:00");
        assert_eq!(boundary_at(now, TimeDelta::zero()), now);
    }
}
