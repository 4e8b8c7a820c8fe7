//! OVID style holdings: journals with their access entitlements.

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};
use serde::Deserialize;

use crate::embargo::{EmbargoError, boundary_at, resolve_delay};

/// One journal of a holdings file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "HoldingXml")]
pub struct Holding {
    pub ezb_id: Option<u64>,
    pub title: String,
    pub publishers: String,
    pub print_issns: Vec<String>,
    pub electronic_issns: Vec<String>,
    pub entitlements: Vec<Entitlement>,
}

impl Holding {
    /// Print ISSNs first, then electronic ones
    pub fn issns(&self) -> impl Iterator<Item = &str> {
        self.print_issns
            .iter()
            .chain(&self.electronic_issns)
            .map(String::as_str)
    }
}

/// Start or end of an entitlement. Unset parts are unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bound {
    pub year: Option<i32>,
    pub volume: Option<i32>,
    pub issue: Option<i32>,
    pub delay: Option<String>,
}

/// Access grant for one journal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entitlement {
    pub status: String,
    /// Access URL, percent-encoded as in the file
    pub url: String,
    pub anchor: String,
    pub begin: Bound,
    pub end: Bound,
}

/// Why an entitlement does not cover an article
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverageError {
    BeforeBegin,
    AfterEnd,
    /// Published after the moving wall
    MovingWall { boundary: DateTime<Utc> },
    Delay(EmbargoError),
}

impl std::fmt::Display for CoverageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BeforeBegin => write!(f, "before entitlement begin"),
            Self::AfterEnd => write!(f, "after entitlement end"),
            Self::MovingWall { boundary } => {
                write!(f, "behind moving wall ({})", boundary.format("%Y-%m-%d"))
            }
            Self::Delay(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CoverageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Delay(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EmbargoError> for CoverageError {
    fn from(e: EmbargoError) -> Self {
        Self::Delay(e)
    }
}

impl Entitlement {
    /// Effective delay, zero when neither boundary has one
    pub fn delay(&self) -> Result<TimeDelta, EmbargoError> {
        resolve_delay(self.begin.delay.as_deref(), self.end.delay.as_deref())
    }

    pub fn boundary_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, EmbargoError> {
        Ok(boundary_at(now, self.delay()?))
    }

    pub fn boundary(&self) -> Result<DateTime<Utc>, EmbargoError> {
        self.boundary_at(Utc::now())
    }

    /// Whether an article published on `date` in `volume`/`issue` is
    /// accessible at `now`.
    ///
    /// Volume and issue only matter in the boundary years themselves and
    /// are ignored when unknown.
    pub fn covers_at(
        &self,
        now: DateTime<Utc>,
        date: NaiveDate,
        volume: Option<i32>,
        issue: Option<i32>,
    ) -> Result<(), CoverageError> {
        let position = (date.year(), volume, issue);
        if precedes(position, &self.begin) {
            return Err(CoverageError::BeforeBegin);
        }
        if exceeds(position, &self.end) {
            return Err(CoverageError::AfterEnd);
        }
        let delay = self.delay()?;
        if delay != TimeDelta::zero() {
            let boundary = boundary_at(now, delay);
            if date > boundary.date_naive() {
                return Err(CoverageError::MovingWall { boundary });
            }
        }
        Ok(())
    }

    pub fn covers(
        &self,
        date: NaiveDate,
        volume: Option<i32>,
        issue: Option<i32>,
    ) -> Result<(), CoverageError> {
        self.covers_at(Utc::now(), date, volume, issue)
    }

    /// Access URL with percent escapes decoded
    pub fn unescaped_url(&self) -> String {
        query_unescape(&self.url)
    }

    /// Like `Display`, with the boundary relative to `now`
    pub fn describe_at(&self, now: DateTime<Utc>) -> String {
        let n = |v: Option<i32>| v.unwrap_or(0);
        let (boundary, hours) = match self.delay() {
            Ok(delay) => (
                boundary_at(now, delay).to_rfc3339(),
                delay.num_seconds() as f64 / 3600.0,
            ),
            Err(_) => ("invalid".to_string(), 0.0),
        };
        format!(
            "<Entitlement status={} url={} range={}/{}/{}-{}/{}/{} boundary={} delay={:.2}>",
            self.status,
            self.unescaped_url(),
            n(self.begin.year),
            n(self.begin.volume),
            n(self.begin.issue),
            n(self.end.year),
            n(self.end.volume),
            n(self.end.issue),
            boundary,
            hours,
        )
    }
}

impl std::fmt::Display for Entitlement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe_at(Utc::now()))
    }
}

type Position = (i32, Option<i32>, Option<i32>);

/// `position` lies before the begin bound
fn precedes((year, volume, issue): Position, bound: &Bound) -> bool {
    let Some(begin_year) = bound.year else {
        return false;
    };
    if year != begin_year {
        return year < begin_year;
    }
    match (volume, bound.volume) {
        (Some(v), Some(bv)) if v != bv => v < bv,
        (Some(_), Some(_)) => matches!((issue, bound.issue), (Some(i), Some(bi)) if i < bi),
        _ => false,
    }
}

/// `position` lies after the end bound
fn exceeds((year, volume, issue): Position, bound: &Bound) -> bool {
    let Some(end_year) = bound.year else {
        return false;
    };
    if year != end_year {
        return year > end_year;
    }
    match (volume, bound.volume) {
        (Some(v), Some(bv)) if v != bv => v > bv,
        (Some(_), Some(_)) => matches!((issue, bound.issue), (Some(i), Some(bi)) if i > bi),
        _ => false,
    }
}

/// Decode `%XX` escapes and `+` as in URL query strings. Malformed escapes
/// are kept as they are.
fn query_unescape(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = &bytes[i + 1..i + 3];
                let decoded = std::str::from_utf8(hex)
                    .ok()
                    .filter(|_| hex.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match decoded {
                    Some(b) => {
                        out.push(b);
                        i += 3;
                        continue;
                    }
                    None => out.push(b'%'),
                }
            }
            b'+' => out.push(b' '),
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

// XML shape

#[derive(Deserialize)]
struct HoldingXml {
    #[serde(rename = "@ezb_id", default)]
    ezb_id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    publishers: String,
    #[serde(rename = "EZBIssns", default)]
    issns: IssnsXml,
    #[serde(default)]
    entitlements: EntitlementsXml,
}

#[derive(Default, Deserialize)]
struct IssnsXml {
    #[serde(rename = "p-issn", default)]
    print: Vec<String>,
    #[serde(rename = "e-issn", default)]
    electronic: Vec<String>,
}

#[derive(Default, Deserialize)]
struct EntitlementsXml {
    #[serde(rename = "entitlement", default)]
    items: Vec<EntitlementXml>,
}

#[derive(Deserialize)]
struct EntitlementXml {
    #[serde(rename = "@status", default)]
    status: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    anchor: String,
    #[serde(default)]
    begin: BoundXml,
    #[serde(default)]
    end: BoundXml,
}

#[derive(Default, Deserialize)]
struct BoundXml {
    #[serde(default)]
    year: String,
    #[serde(default)]
    volume: String,
    #[serde(default)]
    issue: String,
    #[serde(default)]
    delay: String,
}

fn number(s: &str) -> Option<i32> {
    s.trim().parse().ok()
}

impl From<BoundXml> for Bound {
    fn from(b: BoundXml) -> Self {
        let delay = b.delay.trim();
        Self {
            year: number(&b.year),
            volume: number(&b.volume),
            issue: number(&b.issue),
            delay: (!delay.is_empty()).then(|| delay.to_string()),
        }
    }
}

impl From<EntitlementXml> for Entitlement {
    fn from(e: EntitlementXml) -> Self {
        Self {
            status: e.status,
            url: e.url.trim().to_string(),
            anchor: e.anchor,
            begin: e.begin.into(),
            end: e.end.into(),
        }
    }
}

impl From<HoldingXml> for Holding {
    fn from(h: HoldingXml) -> Self {
        Self {
            ezb_id: h.ezb_id.as_deref().and_then(|s| s.trim().parse().ok()),
            title: h.title,
            publishers: h.publishers,
            print_issns: h.issns.print,
            electronic_issns: h.issns.electronic,
            entitlements: h.entitlements.items.into_iter().map(Into::into).collect(),
        }
    }
}
