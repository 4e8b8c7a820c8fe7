//! Attach institution labels (ISILs) to records covered by holdings

use bibline_core::{Outcome, Rejection, Skip};
use bibline_schema::IntermediateRecord;
use chrono::{DateTime, Utc};

use crate::embargo::EmbargoError;
use crate::index::HoldingsIndex;
use crate::ovid::CoverageError;

/// Labels records whose ISSN, date, volume and issue fall into an
/// entitlement of the index.
///
/// The clock is fixed at construction so that all records of one run are
/// judged against the same moving wall.
#[derive(Debug, Clone)]
pub struct Labeler<'a> {
    index: &'a HoldingsIndex,
    isil: String,
    now: DateTime<Utc>,
}

/// Leading digits of a volume or issue such as `12`, `12a` or `3-4`
fn leading_number(s: &str) -> Option<i32> {
    let s = s.trim();
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().ok()
}

impl<'a> Labeler<'a> {
    pub fn new(index: &'a HoldingsIndex, isil: impl Into<String>) -> Self {
        Self::at(index, isil, Utc::now())
    }

    pub fn at(index: &'a HoldingsIndex, isil: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            index,
            isil: isil.into(),
            now,
        }
    }

    pub fn isil(&self) -> &str {
        &self.isil
    }

    /// Whether any entitlement covers the record.
    ///
    /// `Ok(false)` when no holding matches or none covers; a delay mismatch
    /// on a matching holding is reported only if nothing else covers. An
    /// unreadable delay never covers.
    pub fn covered(&self, record: &IntermediateRecord) -> Result<bool, EmbargoError> {
        let Some(date) = record.date else {
            return Ok(false);
        };
        let volume = leading_number(&record.volume);
        let issue = leading_number(&record.issue);

        let mut mismatch = None;
        for issn in &record.issn {
            let Some(holding) = self.index.lookup(issn) else {
                continue;
            };
            for entitlement in &holding.entitlements {
                match entitlement.covers_at(self.now, date, volume, issue) {
                    Ok(()) => return Ok(true),
                    Err(CoverageError::Delay(e @ EmbargoError::Mismatch { .. })) => {
                        log::debug!("{}: {e} ({issn})", record.id);
                        mismatch.get_or_insert(e);
                    }
                    Err(reason) => log::trace!("{}: {reason} ({issn})", record.id),
                }
            }
        }
        match mismatch {
            Some(e) => Err(e),
            None => Ok(false),
        }
    }

    /// Add the ISIL to covered records.
    ///
    /// Uncovered records pass unchanged; broken delays on a matching holding
    /// make the record a skip.
    pub fn apply(&self, mut record: IntermediateRecord) -> Outcome<IntermediateRecord> {
        match self.covered(&record) {
            Ok(true) => {
                if !record.labels.iter().any(|l| l == &self.isil) {
                    record.labels.push(self.isil.clone());
                }
                Ok(record)
            }
            Ok(false) => Ok(record),
            Err(e) => {
                let skip = Skip::new("embargo mismatch").with_detail(e.to_string());
                Err(Rejection::skip(record, skip))
            }
        }
    }
}
