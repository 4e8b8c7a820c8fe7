//! Crossref works API records, one JSON document per line

use bibline_core::{Outcome, RecordError, Rejection, Skip};
use bibline_schema::normalize::date::from_parts;
use bibline_schema::normalize::pages::parse_page_field;
use bibline_schema::normalize::title::combined_title;
use bibline_schema::{Author, IntermediateRecord, Issn, checked_id};
use serde::Deserialize;

use crate::adapter::{Framing, SourceAdapter};
use crate::tables::MemberNames;

pub const FORMAT: &str = "ElectronicArticle";
pub const GENRE: &str = "article";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CrossrefAuthor {
    pub family: String,
    pub given: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DateField {
    #[serde(rename = "date-parts")]
    pub date_parts: Vec<Vec<Option<i64>>>,
}

/// One work as returned by the works API. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Work {
    #[serde(rename = "author")]
    pub authors: Vec<CrossrefAuthor>,
    #[serde(rename = "container-title")]
    pub container_title: Vec<String>,
    #[serde(rename = "DOI")]
    pub doi: String,
    #[serde(rename = "ISSN")]
    pub issn: Vec<String>,
    pub issue: String,
    pub issued: DateField,
    pub member: String,
    pub page: String,
    pub publisher: String,
    #[serde(rename = "subject")]
    pub subjects: Vec<String>,
    pub subtitle: Vec<String>,
    pub title: Vec<String>,
    #[serde(rename = "type")]
    pub work_type: String,
    #[serde(rename = "URL")]
    pub url: String,
    pub volume: String,
}

impl Work {
    /// Numeric member id, the last path segment of `member`
    pub fn member_id(&self) -> Option<u64> {
        self.member.rsplit('/').next()?.trim().parse().ok()
    }
}

/// Crossref adapter; member names resolve mega collections.
#[derive(Debug, Clone, Default)]
pub struct CrossrefAdapter {
    members: MemberNames,
}

impl CrossrefAdapter {
    pub fn new(members: MemberNames) -> Self {
        Self { members }
    }
}

impl SourceAdapter for CrossrefAdapter {
    type Raw = Work;

    const SOURCE_ID: &'static str = "49";
    const FRAMING: Framing = Framing::JsonLines;

    fn convert(&self, work: Work) -> Outcome<IntermediateRecord> {
        let mut record = IntermediateRecord {
            source_id: Self::SOURCE_ID.to_string(),
            format: FORMAT.to_string(),
            genre: GENRE.to_string(),
            ..Default::default()
        };

        // Only the first date-parts entry counts; null parts end it
        let parts: Vec<i64> = work
            .issued
            .date_parts
            .first()
            .map(|p| p.iter().map_while(|v| *v).collect())
            .unwrap_or_default();
        match from_parts(&parts) {
            Some(date) => record.date = Some(date),
            None => {
                let skip = Skip::new("no date").with_detail(format!("{parts:?}"));
                return Err(Rejection::skip(record, skip));
            }
        }

        let url = work.url.trim();
        if url.is_empty() {
            return Err(Rejection::error(record, RecordError::new("URL is missing")));
        }
        record.id = match checked_id(Self::SOURCE_ID, url) {
            Ok(id) => id,
            Err(skip) => return Err(Rejection::skip(record, skip)),
        };
        record.record_id = url.to_string();
        record.url.push(url.to_string());

        record.article_title = combined_title(
            work.title.first().map(String::as_str),
            work.subtitle.first().map(String::as_str),
        );
        record.journal_title = work.container_title.first().cloned().unwrap_or_default();
        record.doi = work.doi.trim().to_string();
        record.issn = work
            .issn
            .iter()
            .filter_map(|s| Issn::parse(s).ok())
            .map(|issn| issn.to_string())
            .collect();
        record.issue = work.issue.trim().to_string();
        record.volume = work.volume.trim().to_string();
        record.languages = vec!["en".to_string()];
        if !work.publisher.trim().is_empty() {
            record.publishers.push(work.publisher.trim().to_string());
        }
        record.subjects = work.subjects.clone();
        record.work_type = work.work_type.clone();
        record.authors = work
            .authors
            .iter()
            .filter(|a| !(a.family.trim().is_empty() && a.given.trim().is_empty()))
            .map(|a| Author::from_parts(a.family.trim(), a.given.trim()))
            .collect();

        record.pages = work.page.trim().to_string();
        record.set_page_range(parse_page_field(&work.page));

        if let Some(name) = work.member_id().and_then(|id| self.members.get(id)) {
            record.mega_collections.push(format!("{name} (CrossRef)"));
        }

        record.dedup();
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const WORK: &str = r#"{
        "author": [{"family": "Doe", "given": "Jane"}, {"family": "Roe"}, {"family": "Doe", "given": "Jane"}],
        "container-title": ["Journal of Molecular Modeling", "J Mol Model"],
        "DOI": "10.1007/s00894-016-3000-x",
        "ISSN": ["1610-2940", "0948-5023", "invalid"],
        "issue": "7",
        "issued": {"date-parts": [[2016, 7]]},
        "member": "http://id.crossref.org/member/297",
        "page": "73-100",
        "publisher": "Springer Nature",
        "subject": ["Catalysis", "Organic Chemistry"],
        "subtitle": ["a case study"],
        "title": ["Docking revisited"],
        "type": "journal-article",
        "URL": "http://dx.doi.org/10.1007/s00894-016-3000-x",
        "volume": "22",
        "score": 1.0
    }"#;

    fn work() -> Work {
        serde_json::from_str(WORK).unwrap()
    }

    fn adapter() -> CrossrefAdapter {
        CrossrefAdapter::new([(297, "Springer (Biomed Central Ltd.)".to_string())].into_iter().collect())
    }

    #[test]
    fn converts_work() {
        let record = adapter().convert(work()).unwrap();
        assert_eq!(record.source_id, "49");
        assert_eq!(record.id, checked_id("49", "http://dx.doi.org/10.1007/s00894-016-3000-x").unwrap());
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2016, 7, 1));
        assert_eq!(record.article_title, "Docking revisited : a case study");
        assert_eq!(record.journal_title, "Journal of Molecular Modeling");
        assert_eq!(record.issn, vec!["1610-2940", "0948-5023"]);
        assert_eq!(record.authors.len(), 2);
        assert_eq!(record.authors[1].to_string(), "Roe");
        assert_eq!(record.start_page, "73");
        assert_eq!(record.page_count, "27");
        assert_eq!(record.languages, vec!["en"]);
        assert_eq!(record.publishers, vec!["Springer Nature"]);
        assert_eq!(record.work_type, "journal-article");
        assert_eq!(record.mega_collections, vec!["Springer (Biomed Central Ltd.) (CrossRef)"]);
    }

    #[test]
    fn unknown_member_has_no_collection() {
        let record = CrossrefAdapter::default().convert(work()).unwrap();
        assert!(record.mega_collections.is_empty());
    }

    #[test]
    fn missing_date_is_a_skip() {
        let mut w = work();
        w.issued = DateField::default();
        let rejection = CrossrefAdapter::default().convert(w).unwrap_err();
        assert!(rejection.is_skip());
    }

    #[test]
    fn null_date_parts() {
        let w: Work = serde_json::from_str(
            r#"{"URL": "http://x", "issued": {"date-parts": [[2001, null]]}}"#,
        )
        .unwrap();
        let record = CrossrefAdapter::default().convert(w).unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2001, 1, 1));

        let w: Work =
            serde_json::from_str(r#"{"URL": "http://x", "issued": {"date-parts": [[null]]}}"#).unwrap();
        assert!(CrossrefAdapter::default().convert(w).unwrap_err().is_skip());
    }

    #[test]
    fn missing_url_is_an_error() {
        let mut w = work();
        w.url.clear();
        let rejection = CrossrefAdapter::default().convert(w).unwrap_err();
        assert!(!rejection.is_skip());
        assert!(matches!(rejection, Rejection::Error { ref error, .. } if error.message() == "URL is missing"));
    }

    #[test]
    fn conversion_is_deterministic() {
        let a = adapter().convert(work()).unwrap();
        let b = adapter().convert(work()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn member_id_from_uri() {
        assert_eq!(work().member_id(), Some(297));
        let w = Work {
            member: "78".into(),
            ..Default::default()
        };
        assert_eq!(w.member_id(), Some(78));
        assert_eq!(Work::default().member_id(), None);
    }
}
