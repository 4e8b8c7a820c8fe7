//! ISSN → holding index, built once and read-only afterwards

use std::io::BufRead;

use bibline_core::{MalformedElement, RecordDecoder, Source, StreamError, XmlElementDecoder, open_source};
use bibline_schema::Issn;
use rustc_hash::FxHashMap;

use crate::embargo::EmbargoError;
use crate::ovid::Holding;

/// Holdings keyed by print and electronic ISSN.
///
/// A later holding listing the same ISSN replaces the earlier one.
#[derive(Debug, Clone, Default)]
pub struct HoldingsIndex {
    holdings: Vec<Holding>,
    by_issn: FxHashMap<String, usize>,
    malformed: usize,
}

/// Canonical `NNNN-NNNC` form; unparsable values are kept trimmed
fn issn_key(raw: &str) -> String {
    match Issn::parse(raw) {
        Ok(issn) => issn.as_str().to_string(),
        Err(_) => raw.trim().to_string(),
    }
}

impl HoldingsIndex {
    /// Read all `<holding>` elements; malformed ones are skipped and counted.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, StreamError> {
        let mut decoder: XmlElementDecoder<R, Holding> =
            XmlElementDecoder::new(reader, "holding", MalformedElement::Skip);
        let mut index = Self::default();
        for holding in decoder.by_ref() {
            index.insert(holding?);
        }
        index.malformed += decoder.malformed();
        log::debug!(
            "holdings index: {} holdings, {} ISSNs, {} malformed",
            index.holdings.len(),
            index.by_issn.len(),
            index.malformed
        );
        Ok(index)
    }

    /// Open a holdings file (plain, gzip or zip) or URL and index it
    pub fn open(source: &Source) -> Result<Self, StreamError> {
        let opened = open_source(source)?;
        Self::from_reader(opened.reader)
    }

    /// Add a holding. Entitlements with an unreadable delay are dropped and
    /// counted as malformed; mismatched delays are kept.
    pub fn insert(&mut self, mut holding: Holding) {
        let before = holding.entitlements.len();
        let title = &holding.title;
        holding.entitlements.retain(|entitlement| match entitlement.delay() {
            Err(EmbargoError::UnknownFormat(delay)) => {
                log::warn!("holding {title:?}: dropping entitlement, unknown delay {delay:?}");
                false
            }
            _ => true,
        });
        self.malformed += before - holding.entitlements.len();

        let idx = self.holdings.len();
        for issn in holding.issns() {
            if issn.trim().is_empty() {
                continue;
            }
            self.by_issn.insert(issn_key(issn), idx);
        }
        self.holdings.push(holding);
    }

    pub fn lookup(&self, issn: &str) -> Option<&Holding> {
        self.by_issn
            .get(&issn_key(issn))
            .map(|&idx| &self.holdings[idx])
    }

    /// All holdings in file order
    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    /// Number of distinct ISSNs
    pub fn len(&self) -> usize {
        self.by_issn.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_issn.is_empty()
    }

    /// Holdings and entitlements dropped because they did not match the
    /// expected shape
    pub fn malformed(&self) -> usize {
        self.malformed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SPRINGER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<holdings>
<holding ezb_id = "1">
  <title><![CDATA[Journal of Molecular Modeling]]></title>
  <publishers><![CDATA[Springer]]></publishers>
  <EZBIssns>
    <p-issn>1610-2940</p-issn>
    <e-issn>0948-5023</e-issn>
  </EZBIssns>
  <entitlements>
    <entitlement status = "subscribed">
      <url>http%3A%2F%2Flink.springer.com%2Fjournal%2F894</url>
      <anchor>natli_springer</anchor>
      <begin>
        <year>1995</year>
        <volume>1</volume>
      </begin>
      <end>
        <year>2002</year>
        <volume>8</volume>
      </end>
      <available><![CDATA[Nationallizenz]]></available>
    </entitlement>
    <entitlement status = "subscribed">
      <url>http%3A%2F%2Flink.springer.com%2Fjournal%2F894</url>
      <anchor>springer</anchor>
      <available><![CDATA[Konsortiallizenz - Gesamter Zeitraum]]></available>
    </entitlement>
  </entitlements>
</holding>
</holdings>"#;

    #[test]
    fn parses_holding_and_entitlements() {
        let index = HoldingsIndex::from_reader(Cursor::new(SPRINGER)).unwrap();
        let holding = index.lookup("1610-2940").unwrap();
        assert_eq!(holding.ezb_id, Some(1));
        assert_eq!(holding.title, "Journal of Molecular Modeling");
        assert_eq!(holding.publishers, "Springer");
        assert_eq!(holding.entitlements.len(), 2);

        let first = &holding.entitlements[0];
        assert_eq!(first.status, "subscribed");
        assert_eq!(first.anchor, "natli_springer");
        assert_eq!(first.unescaped_url(), "http://link.springer.com/journal/894");
        assert_eq!((first.begin.year, first.begin.volume), (Some(1995), Some(1)));
        assert_eq!((first.end.year, first.end.volume), (Some(2002), Some(8)));
        assert_eq!(first.begin.issue, None);

        let second = &holding.entitlements[1];
        assert_eq!(second.begin, Default::default());
        assert_eq!(second.end.delay, None);
    }

    #[test]
    fn both_issn_kinds_are_indexed() {
        let index = HoldingsIndex::from_reader(Cursor::new(SPRINGER)).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.holdings().len(), 1);
        let print = index.lookup("1610-2940").unwrap();
        let electronic = index.lookup("0948-5023").unwrap();
        assert_eq!(print, electronic);
        // Lookups are normalized
        assert!(index.lookup("16102940").is_some());
        assert!(index.lookup("0000-0000").is_none());
    }

    #[test]
    fn malformed_holding_is_skipped() {
        let xml = r#"<holdings>
<holding ezb_id="2"><EZBIssns><p-issn>1234-5679</p-issn></EZBIssns>
  <entitlements><entitlement><begin><year>2001</year></begin><begin><year>2002</year></begin></entitlement></entitlements>
</holding>
<holding ezb_id="3"><EZBIssns><e-issn>2049-3630</e-issn></EZBIssns></holding>
</holdings>"#;
        let index = HoldingsIndex::from_reader(Cursor::new(xml)).unwrap();
        assert_eq!(index.malformed(), 1);
        assert_eq!(index.lookup("2049-3630").unwrap().ezb_id, Some(3));
        assert!(index.lookup("1234-5679").is_none());
    }

    #[test]
    fn syntax_error_is_fatal() {
        let xml = "<holdings><holding><title>x</titel></holding></holdings>";
        assert!(HoldingsIndex::from_reader(Cursor::new(xml)).is_err());
    }

    #[test]
    fn unreadable_delay_drops_entitlement() {
        let xml = r#"<holdings>
<holding ezb_id="4"><title>Typo</title><EZBIssns><p-issn>1610-2940</p-issn></EZBIssns>
  <entitlements>
    <entitlement status="subscribed"><begin><year>2000</year></begin><end><delay>-1D</delay></end></entitlement>
    <entitlement status="subscribed"><begin><year>1990</year></begin><end><year>1999</year></end></entitlement>
  </entitlements>
</holding>
</holdings>"#;
        let index = HoldingsIndex::from_reader(Cursor::new(xml)).unwrap();
        assert_eq!(index.malformed(), 1);
        let holding = index.lookup("1610-2940").unwrap();
        assert_eq!(holding.entitlements.len(), 1);
        assert_eq!(holding.entitlements[0].end.year, Some(1999));
    }

    #[test]
    fn mismatched_delays_are_kept() {
        let xml = r#"<holdings>
<holding><EZBIssns><p-issn>2049-3630</p-issn></EZBIssns>
  <entitlements><entitlement><begin><delay>-1M</delay></begin><end><delay>-2M</delay></end></entitlement></entitlements>
</holding>
</holdings>"#;
        let index = HoldingsIndex::from_reader(Cursor::new(xml)).unwrap();
        assert_eq!(index.malformed(), 0);
        assert_eq!(index.lookup("2049-3630").unwrap().entitlements.len(), 1);
    }

    #[test]
    fn later_holding_wins() {
        let xml = r#"<holdings>
<holding ezb_id="1"><EZBIssns><p-issn>2049-3630</p-issn></EZBIssns></holding>
<holding ezb_id="2"><EZBIssns><e-issn>2049-3630</e-issn></EZBIssns></holding>
</holdings>"#;
        let index = HoldingsIndex::from_reader(Cursor::new(xml)).unwrap();
        assert_eq!(index.lookup("2049-3630").unwrap().ezb_id, Some(2));
    }
}
