//! GenderOpen repository records, OAI-DC harvested as `<Record>` XML

use bibline_core::{Outcome, RecordError, Rejection};
use bibline_schema::normalize::date::from_year_prefix;
use bibline_schema::normalize::ident::Identifiers;
use bibline_schema::normalize::pages::find_page_range;
use bibline_schema::normalize::title::{Container, classify_container};
use bibline_schema::{Author, IntermediateRecord, checked_id, encode_natural_id};
use serde::Deserialize;

use crate::adapter::{Framing, SourceAdapter};

pub const MEGA_COLLECTION: &str = "Gender Open";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Header {
    #[serde(rename = "@status")]
    pub status: String,
    pub identifier: String,
    pub datestamp: String,
    #[serde(rename = "setSpec")]
    pub set_spec: Vec<String>,
}

/// Dublin Core fields; every element may repeat.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DublinCore {
    pub title: Vec<String>,
    pub creator: Vec<String>,
    pub contributor: Vec<String>,
    pub subject: Vec<String>,
    pub date: Vec<String>,
    #[serde(rename = "type")]
    pub kind: Vec<String>,
    pub identifier: Vec<String>,
    pub language: Vec<String>,
    pub rights: Vec<String>,
    pub format: Vec<String>,
    pub publisher: Vec<String>,
    pub source: Vec<String>,
    pub description: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub dc: DublinCore,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Record {
    pub header: Header,
    pub metadata: Metadata,
}

fn first(values: &[String]) -> &str {
    values.first().map(|s| s.trim()).unwrap_or_default()
}

fn non_empty(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GenderOpenAdapter;

impl SourceAdapter for GenderOpenAdapter {
    type Raw = Record;

    const SOURCE_ID: &'static str = "162";
    const FRAMING: Framing = Framing::XmlElements("Record");

    fn convert(&self, raw: Record) -> Outcome<IntermediateRecord> {
        let dc = &raw.metadata.dc;
        let mut record = IntermediateRecord {
            source_id: Self::SOURCE_ID.to_string(),
            format: "ElectronicArticle".to_string(),
            genre: "article".to_string(),
            ref_type: "EJOUR".to_string(),
            mega_collections: vec![MEGA_COLLECTION.to_string()],
            open_access: true,
            ..Default::default()
        };

        let natural_id = raw.header.identifier.trim();
        if natural_id.is_empty() {
            return Err(Rejection::error(record, RecordError::new("record without header identifier")));
        }
        record.id = match checked_id(Self::SOURCE_ID, natural_id) {
            Ok(id) => id,
            Err(skip) => return Err(Rejection::skip(record, skip)),
        };
        // Encoded like the global id suffix, never the raw OAI identifier
        record.record_id = encode_natural_id(natural_id);

        record.article_title = first(&dc.title).to_string();
        record.authors = non_empty(&dc.creator).into_iter().map(Author::named).collect();
        record.languages = non_empty(&dc.language);
        record.publishers = non_empty(&dc.publisher);
        record.subjects = non_empty(&dc.subject);

        let ids = Identifiers::classify_all(dc.identifier.iter().map(String::as_str));
        record.url = ids.urls;
        record.issn = ids.issns.iter().map(ToString::to_string).collect();
        record.doi = ids.doi.unwrap_or_default();

        let source = first(&dc.source);
        match classify_container(&record.article_title, source, !record.issn.is_empty()) {
            Container::Journal(title) => record.journal_title = title,
            Container::Book(title) => record.book_title = title,
        }

        match from_year_prefix(first(&dc.date)) {
            Ok(date) => record.date = Some(date),
            Err(skip) => return Err(Rejection::skip(record, skip)),
        }

        record.set_page_range(find_page_range(source));
        record.dedup();
        Ok(record)
    }
}
