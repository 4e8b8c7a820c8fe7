//! The intermediate record every source adapter converges to

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::normalize::dedup_in_place;
use crate::normalize::pages::PageRange;

/// One author, either as a preformatted name or as family/given parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "rft.au", default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "rft.aulast", default, skip_serializing_if = "String::is_empty")]
    pub last_name: String,
    #[serde(rename = "rft.aufirst", default, skip_serializing_if = "String::is_empty")]
    pub first_name: String,
}

impl Author {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn from_parts(last_name: impl Into<String>, first_name: impl Into<String>) -> Self {
        Self {
            last_name: last_name.into(),
            first_name: first_name.into(),
            ..Default::default()
        }
    }
}

/// `name` if set, else `Last, First`, else whichever part exists.
impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.name.is_empty() {
            return write!(f, "{}", self.name);
        }
        match (self.last_name.is_empty(), self.first_name.is_empty()) {
            (false, false) => write!(f, "{}, {}", self.last_name, self.first_name),
            (false, true) => write!(f, "{}", self.last_name),
            (true, false) => write!(f, "{}", self.first_name),
            (true, true) => Ok(()),
        }
    }
}

/// Canonical bibliographic record.
///
/// Field names on the wire follow the finc intermediate schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntermediateRecord {
    /// Global identifier, `ai-<source>-<base64url(natural id)>`
    #[serde(rename = "finc.id")]
    pub id: String,
    /// Source-local identifier
    #[serde(rename = "finc.record_id")]
    pub record_id: String,
    #[serde(rename = "finc.source_id")]
    pub source_id: String,
    #[serde(rename = "finc.format")]
    pub format: String,
    #[serde(rename = "finc.mega_collection", skip_serializing_if = "Vec::is_empty")]
    pub mega_collections: Vec<String>,
    #[serde(rename = "ris.type", skip_serializing_if = "String::is_empty")]
    pub ref_type: String,
    #[serde(rename = "rft.genre", skip_serializing_if = "String::is_empty")]
    pub genre: String,

    #[serde(rename = "rft.atitle", skip_serializing_if = "String::is_empty")]
    pub article_title: String,
    #[serde(rename = "rft.subtitle", skip_serializing_if = "String::is_empty")]
    pub article_subtitle: String,
    #[serde(rename = "rft.btitle", skip_serializing_if = "String::is_empty")]
    pub book_title: String,
    #[serde(rename = "rft.jtitle", skip_serializing_if = "String::is_empty")]
    pub journal_title: String,

    #[serde(rename = "authors", skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
    #[serde(rename = "rft.pub", skip_serializing_if = "Vec::is_empty")]
    pub publishers: Vec<String>,

    #[serde(rename = "rft.issn", skip_serializing_if = "Vec::is_empty")]
    pub issn: Vec<String>,
    #[serde(rename = "doi", skip_serializing_if = "String::is_empty")]
    pub doi: String,
    #[serde(rename = "url", skip_serializing_if = "Vec::is_empty")]
    pub url: Vec<String>,

    /// Publication date, serialized as `YYYY-MM-DD`
    #[serde(rename = "rft.date", skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "rft.volume", skip_serializing_if = "String::is_empty")]
    pub volume: String,
    #[serde(rename = "rft.issue", skip_serializing_if = "String::is_empty")]
    pub issue: String,

    /// Raw page expression as found in the source
    #[serde(rename = "rft.pages", skip_serializing_if = "String::is_empty")]
    pub pages: String,
    #[serde(rename = "rft.spage", skip_serializing_if = "String::is_empty")]
    pub start_page: String,
    #[serde(rename = "rft.epage", skip_serializing_if = "String::is_empty")]
    pub end_page: String,
    #[serde(rename = "rft.tpages", skip_serializing_if = "String::is_empty")]
    pub page_count: String,

    #[serde(rename = "abstract", skip_serializing_if = "String::is_empty")]
    pub abstract_text: String,
    #[serde(rename = "x.fulltext", skip_serializing_if = "String::is_empty")]
    pub fulltext: String,
    #[serde(rename = "x.subjects", skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,
    #[serde(rename = "languages", skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    #[serde(rename = "x.packages", skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,
    /// ISILs of institutions whose holdings cover this record
    #[serde(rename = "x.labels", skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(rename = "x.oa", skip_serializing_if = "std::ops::Not::not")]
    pub open_access: bool,
    /// Source-specific work type, e.g. `journal-article`
    #[serde(rename = "x.type", skip_serializing_if = "String::is_empty")]
    pub work_type: String,
}

impl IntermediateRecord {
    /// Set start, end and count from a parsed range; `None` clears all three.
    pub fn set_page_range(&mut self, range: Option<PageRange>) {
        match range {
            Some(range) => {
                self.start_page = range.start.to_string();
                self.end_page = range.end.to_string();
                self.page_count = range.count().to_string();
            }
            None => {
                self.start_page.clear();
                self.end_page.clear();
                self.page_count.clear();
            }
        }
    }

    pub fn year(&self) -> Option<i32> {
        self.date.map(|d| d.year())
    }

    /// Drop repeated authors, ISSNs, subjects, languages and packages,
    /// keeping the first occurrence of each.
    pub fn dedup(&mut self) {
        dedup_in_place(&mut self.authors);
        dedup_in_place(&mut self.issn);
        dedup_in_place(&mut self.subjects);
        dedup_in_place(&mut self.languages);
        dedup_in_place(&mut self.packages);
    }
}
