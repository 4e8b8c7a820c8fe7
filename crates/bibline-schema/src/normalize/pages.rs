//! Page ranges

use std::sync::LazyLock;

use regex::Regex;

static RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([1-9][0-9]*)-([1-9][0-9]*)").expect("valid page regex"));

/// Inclusive page range with `end >= start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }

    /// `end - start`, so `73-100` counts 27
    pub fn count(&self) -> u32 {
        self.end - self.start
    }
}

/// First `N-M` range inside free text such as a citation string.
///
/// Only the first candidate is considered; a reversed range yields `None`.
pub fn find_page_range(text: &str) -> Option<PageRange> {
    let caps = RANGE.captures(text)?;
    let start = caps[1].parse().ok()?;
    let end = caps[2].parse().ok()?;
    PageRange::new(start, end)
}

/// A whole field of the form `N-M`, as in API `page` values.
pub fn parse_page_field(field: &str) -> Option<PageRange> {
    let (start, end) = field.trim().split_once('-')?;
    let start = start.trim().parse().ok()?;
    let end = end.trim().parse().ok()?;
    PageRange::new(start, end)
}
