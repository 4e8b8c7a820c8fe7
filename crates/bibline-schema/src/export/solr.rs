//! VuFind 3 style Solr documents

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use serde::Serialize;

use super::{ExportError, Exporter};
use crate::normalize::title::{sortable_title, strip_markup};
use crate::record::IntermediateRecord;

/// Placeholder for records without any usable author
pub const NOT_ASSIGNED: &str = "N.N.";
/// `recordtype` of article index records
pub const RECORD_TYPE: &str = "ai";
pub const ACCESS_FACET: &str = "Electronic Resources";

/// Language codes as found in sources → display names
const LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("eng", "English"),
    ("de", "German"),
    ("ger", "German"),
    ("deu", "German"),
    ("fr", "French"),
    ("fre", "French"),
    ("fra", "French"),
    ("it", "Italian"),
    ("ita", "Italian"),
    ("es", "Spanish"),
    ("spa", "Spanish"),
    ("ru", "Russian"),
    ("rus", "Russian"),
    ("pt", "Portuguese"),
    ("por", "Portuguese"),
    ("nl", "Dutch"),
    ("dut", "Dutch"),
    ("nld", "Dutch"),
];

/// One Solr document. Empty fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolrDocument {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub access_facet: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub author_facet: Vec<String>,
    #[serde(rename = "author", skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(rename = "author2", skip_serializing_if = "Vec::is_empty")]
    pub secondary_authors: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub allfields: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub finc_class_facet: Vec<String>,
    #[serde(rename = "format", skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fullrecord: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fulltext: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "institution", skip_serializing_if = "Vec::is_empty")]
    pub institutions: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub imprint: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issn: Vec<String>,
    #[serde(rename = "language", skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    #[serde(rename = "mega_collection", skip_serializing_if = "Vec::is_empty")]
    pub mega_collections: Vec<String>,
    #[serde(rename = "publishDateSort", skip_serializing_if = "Option::is_none")]
    pub publish_date_sort: Option<i32>,
    #[serde(rename = "publishDate", skip_serializing_if = "Vec::is_empty")]
    pub publish_date: Vec<String>,
    #[serde(rename = "publisher", skip_serializing_if = "Vec::is_empty")]
    pub publishers: Vec<String>,
    #[serde(rename = "recordtype")]
    pub record_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub series: Vec<String>,
    pub source_id: String,
    #[serde(rename = "title_sub", skip_serializing_if = "String::is_empty")]
    pub subtitle: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title_full: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title_short: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title_sort: String,
    #[serde(rename = "topic", skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub url: Vec<String>,

    /// First author only
    pub vf1_author: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vf1_author2: Vec<String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub container_issue: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub container_start_page: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub container_title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub container_volume: String,
}

/// Exporter to [`SolrDocument`]s.
///
/// The subject mapping assigns classification facets to subjects; it is
/// read-only after construction.
#[derive(Debug, Clone)]
pub struct SolrExporter {
    subjects: FxHashMap<String, Vec<String>>,
    languages: FxHashMap<String, String>,
}

impl SolrExporter {
    pub fn new(subject_mapping: FxHashMap<String, Vec<String>>) -> Self {
        let languages = LANGUAGES
            .iter()
            .map(|(code, name)| (code.to_string(), name.to_string()))
            .collect();
        Self {
            subjects: subject_mapping,
            languages,
        }
    }

    pub fn document(&self, record: &IntermediateRecord) -> Result<SolrDocument, ExportError> {
        if record.id.is_empty() {
            return Err(ExportError::MissingField("finc.id"));
        }
        let title = strip_markup(&record.article_title);

        let mut doc = SolrDocument {
            access_facet: ACCESS_FACET.to_string(),
            allfields: allfields(record),
            formats: non_empty(&record.format),
            fullrecord: serde_json::to_string(record)?,
            fulltext: record.fulltext.clone(),
            id: record.id.clone(),
            institutions: record.labels.clone(),
            imprint: imprint(record),
            issn: record.issn.clone(),
            mega_collections: record.mega_collections.clone(),
            publish_date_sort: record.year(),
            publish_date: record
                .date
                .map(|d| vec![d.format("%Y-%m-%d").to_string()])
                .unwrap_or_default(),
            publishers: record.publishers.clone(),
            record_type: RECORD_TYPE.to_string(),
            series: non_empty(&record.journal_title),
            source_id: record.source_id.clone(),
            subtitle: record.article_subtitle.clone(),
            title_sort: sortable_title(&title),
            title_full: title.clone(),
            title_short: title.clone(),
            title,
            topics: record.subjects.clone(),
            url: record.url.clone(),
            container_issue: record.issue.clone(),
            container_start_page: record.start_page.clone(),
            container_title: record.journal_title.clone(),
            container_volume: record.volume.clone(),
            ..Default::default()
        };

        let classes: BTreeSet<&String> = record
            .subjects
            .iter()
            .filter_map(|s| self.subjects.get(s))
            .flatten()
            .collect();
        doc.finc_class_facet = classes.into_iter().cloned().collect();

        doc.languages = record
            .languages
            .iter()
            .map(|code| self.languages.get(code).unwrap_or(code).clone())
            .collect();

        for author in &record.authors {
            let name = sanitize_author(&author.to_string());
            if name.is_empty() {
                continue;
            }
            if doc.vf1_author.is_empty() {
                doc.vf1_author = name.clone();
            } else {
                doc.vf1_author2.push(name.clone());
            }
            doc.author_facet.push(name.clone());
            doc.authors.push(name);
        }
        if doc.authors.is_empty() {
            doc.authors.push(NOT_ASSIGNED.to_string());
            doc.vf1_author = NOT_ASSIGNED.to_string();
        }
        doc.secondary_authors = doc.vf1_author2.clone();

        Ok(doc)
    }
}

impl Exporter for SolrExporter {
    fn name(&self) -> &'static str {
        "solr"
    }

    fn export(&self, record: &IntermediateRecord) -> Result<Vec<u8>, ExportError> {
        Ok(serde_json::to_vec(&self.document(record)?)?)
    }
}

fn non_empty(s: &str) -> Vec<String> {
    if s.is_empty() {
        Vec::new()
    } else {
        vec![s.to_string()]
    }
}

/// Remove characters that break Solr faceting
fn sanitize_author(name: &str) -> String {
    name.replace("--", "")
        .chars()
        .filter(|c| !matches!(c, '#' | '*' | '|'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Searchable text: names, titles, subjects, publishers and abstract
fn allfields(record: &IntermediateRecord) -> String {
    let authors = record.authors.iter().map(ToString::to_string);
    let texts = [
        &record.article_title,
        &record.article_subtitle,
        &record.book_title,
        &record.journal_title,
    ]
    .into_iter()
    .chain(&record.subjects)
    .chain(&record.publishers)
    .chain(std::iter::once(&record.abstract_text))
    .cloned();

    authors
        .chain(texts)
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `Publisher, Year`
fn imprint(record: &IntermediateRecord) -> String {
    let publishers = record.publishers.join("; ");
    match (publishers.is_empty(), record.year()) {
        (false, Some(year)) => format!("{publishers}, {year}"),
        (false, None) => publishers,
        (true, _) => String::new(),
    }
}
