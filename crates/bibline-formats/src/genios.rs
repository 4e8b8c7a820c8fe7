//! Genios full-text documents (`<Document>` XML)

use bibline_core::{Outcome, RecordError, Rejection, Skip};
use bibline_schema::normalize::author::tokenize_authors;
use bibline_schema::normalize::date::year_or_compact;
use bibline_schema::normalize::issn::find_issns;
use bibline_schema::normalize::title::fold_newlines;
use bibline_schema::normalize::{non_placeholder, truncate_chars};
use bibline_schema::{Author, IntermediateRecord, checked_id};
use serde::Deserialize;
use whatlang::Lang;

use crate::adapter::{Framing, SourceAdapter};
use crate::tables::StringListMap;

pub const FORMAT: &str = "ElectronicArticle";
pub const GENRE: &str = "article";
pub const REF_TYPE: &str = "EJOUR";
/// Base name of the collection, used when a database maps to no package
pub const COLLECTION: &str = "Genios";
/// Characters of full text used as abstract when there is none
pub const TEXT_AS_ABSTRACT_CUTOFF: usize = 200;
pub const MAX_TITLE_LENGTH: usize = 2048;
/// Shorter fields (in bytes) are not worth a language guess
pub const MIN_DETECTION_LENGTH: usize = 20;

/// Declared language values → ISO 639-2/B codes kept in records
const LANGUAGES: &[(&str, &str)] = &[
    ("de", "deu"),
    ("deu", "deu"),
    ("ger", "deu"),
    ("deutsch", "deu"),
    ("german", "deu"),
    ("en", "eng"),
    ("eng", "eng"),
    ("englisch", "eng"),
    ("english", "eng"),
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Authors {
    #[serde(rename = "Author")]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Descriptors {
    #[serde(rename = "Descriptor")]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Modules {
    #[serde(rename = "Module")]
    pub items: Vec<String>,
}

/// One `<Document>` element
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Document {
    #[serde(rename = "@ID")]
    pub id: String,
    #[serde(rename = "@DB")]
    pub db: String,
    #[serde(rename = "@IDNAME")]
    pub id_name: String,
    #[serde(rename = "ISSN")]
    pub issn: String,
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Publication-Title")]
    pub publication_title: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Volume")]
    pub volume: String,
    #[serde(rename = "Issue")]
    pub issue: String,
    #[serde(rename = "Authors")]
    pub authors: Authors,
    #[serde(rename = "Language")]
    pub language: String,
    #[serde(rename = "Abstract")]
    pub abstract_text: String,
    #[serde(rename = "Descriptors")]
    pub descriptors: Descriptors,
    #[serde(rename = "Text")]
    pub text: String,
    #[serde(rename = "Modules")]
    pub modules: Modules,
}

impl Document {
    /// `<Source>__<ID>`; the ID alone is not unique across sources
    pub fn source_and_id(&self) -> String {
        format!("{}__{}", self.source.trim(), self.id.trim())
    }

    pub fn url(&self) -> String {
        format!("https://www.wiso-net.de/document/{}", self.source_and_id())
    }

    /// Subject headings split on `;` and `/`, or on `,` when that yields a
    /// single field only.
    pub fn headings(&self) -> Vec<String> {
        let raw = self.descriptors.items.join("; ");
        let fields = split_fields(&raw, &[';', '/']);
        if fields.len() == 1 {
            split_fields(&raw, &[','])
        } else {
            fields
        }
    }

    /// German and English detected in title and text. The declared
    /// `<Language>` value is used only when detection finds neither.
    pub fn languages(&self) -> Vec<String> {
        let mut codes: Vec<String> = [&self.title, &self.text]
            .into_iter()
            .filter_map(|s| detect_language(s.trim()))
            .map(str::to_string)
            .collect();
        if codes.is_empty() {
            codes = self.declared_languages();
        }
        codes.sort_unstable();
        codes.dedup();
        codes
    }

    /// Languages from the declared `<Language>` value, restricted to German
    /// and English.
    pub fn declared_languages(&self) -> Vec<String> {
        let mut codes: Vec<String> = Vec::new();
        for token in self.language.split([';', ',', '/']) {
            let token = token.trim().to_lowercase();
            let Some((_, code)) = LANGUAGES.iter().find(|(name, _)| *name == token) else {
                continue;
            };
            if !codes.iter().any(|c| c == code) {
                codes.push(code.to_string());
            }
        }
        codes
    }

    pub fn authors(&self) -> Vec<Author> {
        self.authors
            .items
            .iter()
            .flat_map(|raw| tokenize_authors(raw))
            .map(Author::named)
            .collect()
    }
}

fn detect_language(s: &str) -> Option<&'static str> {
    if s.len() < MIN_DETECTION_LENGTH {
        return None;
    }
    match whatlang::detect_lang(s)? {
        Lang::Deu => Some("deu"),
        Lang::Eng => Some("eng"),
        _ => None,
    }
}

fn split_fields(raw: &str, separators: &[char]) -> Vec<String> {
    raw.split(separators)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Genios adapter; the database map assigns package names.
#[derive(Debug, Clone, Default)]
pub struct GeniosAdapter {
    dbmap: StringListMap,
}

impl GeniosAdapter {
    pub fn new(dbmap: StringListMap) -> Self {
        Self { dbmap }
    }

    /// `Genios (<package>)` names for a database, reverse sorted so that
    /// the broad `LIT` package comes last
    fn package_names(&self, db: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .dbmap
            .get(db)
            .map(|names| names.iter().map(|n| format!("{COLLECTION} ({n})")).collect())
            .unwrap_or_default();
        names.sort_unstable_by(|a, b| b.cmp(a));
        names
    }
}

impl SourceAdapter for GeniosAdapter {
    type Raw = Document;

    const SOURCE_ID: &'static str = "48";
    const FRAMING: Framing = Framing::XmlElements("Document");

    fn convert(&self, doc: Document) -> Outcome<IntermediateRecord> {
        let mut record = IntermediateRecord {
            source_id: Self::SOURCE_ID.to_string(),
            format: FORMAT.to_string(),
            genre: GENRE.to_string(),
            ref_type: REF_TYPE.to_string(),
            ..Default::default()
        };

        if doc.id.trim().is_empty() {
            return Err(Rejection::error(record, RecordError::new("document without ID")));
        }
        record.record_id = doc.id.trim().to_string();

        match year_or_compact(&doc.year, &doc.date) {
            Ok(date) => record.date = Some(date),
            Err(skip) => return Err(Rejection::skip(record, skip)),
        }

        record.article_title = doc.title.trim().to_string();
        let title_length = record.article_title.chars().count();
        if title_length > MAX_TITLE_LENGTH {
            let skip = Skip::new("article title too long").with_detail(title_length.to_string());
            return Err(Rejection::skip(record, skip));
        }

        record.id = match checked_id(Self::SOURCE_ID, &doc.source_and_id()) {
            Ok(id) => id,
            Err(skip) => return Err(Rejection::skip(record, skip)),
        };
        record.url.push(doc.url());
        record.authors = doc.authors();

        record.abstract_text = match non_placeholder(&doc.abstract_text) {
            Some(text) => text.to_string(),
            None => truncate_chars(&doc.text, TEXT_AS_ABSTRACT_CUTOFF).trim().to_string(),
        };
        record.journal_title = fold_newlines(doc.publication_title.trim());
        record.issn = find_issns(&doc.issn).iter().map(ToString::to_string).collect();
        record.issue = non_placeholder(&doc.issue).unwrap_or_default().to_string();
        record.volume = non_placeholder(&doc.volume).unwrap_or_default().to_string();
        record.languages = doc.languages();
        record.subjects = doc.headings();

        let packages = self.package_names(&doc.db);
        record.mega_collections = match packages.first() {
            Some(first) => vec![first.clone()],
            None => {
                log::debug!("genios: database {:?} has no package, using {COLLECTION}", doc.db);
                vec![COLLECTION.to_string()]
            }
        };
        record.packages = std::iter::once(doc.db.clone())
            .filter(|db| !db.is_empty())
            .chain(packages)
            .chain(doc.modules.items.iter().map(|m| m.trim().to_string()))
            .collect();

        record.fulltext = doc.text;
        record.dedup();
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bibline_core::XmlElementDecoder;
    use chrono::NaiveDate;
    use std::io::Cursor;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Documents>
<Document ID="123" DB="ZECO" IDNAME="ZECO__123">
  <ISSN>0340-1650 (print); 0340-1650</ISSN>
  <Source>ZECO</Source>
  <Publication-Title>Zeitschrift für
Controlling</Publication-Title>
  <Title>Kosten im Griff</Title>
  <Year>2015</Year>
  <Date>20150301</Date>
  <Volume>27</Volume>
  <Issue>n.n.</Issue>
  <Authors>
    <Author>Müller, Hans; Meier, Eva</Author>
    <Author>N.N.</Author>
  </Authors>
  <Language>Deutsch</Language>
  <Abstract></Abstract>
  <Descriptors><Descriptor>Controlling, Kosten, Planung</Descriptor></Descriptors>
  <Text>Die Kosten &amp; der Nutzen von Planung werden in vielen Unternehmen nicht systematisch miteinander verglichen.</Text>
  <Modules><Module>WIWI</Module><Module>FZS</Module></Modules>
</Document>
</Documents>"#;

    fn document() -> Document {
        let mut decoder: XmlElementDecoder<_, Document> = XmlElementDecoder::new(
            Cursor::new(DOCUMENT),
            "Document",
            bibline_core::MalformedElement::Fatal,
        );
        decoder.next().unwrap().unwrap()
    }

    fn adapter() -> GeniosAdapter {
        let mut dbmap = StringListMap::default();
        dbmap.insert("ZECO".into(), vec!["LIT".into(), "Wiwi".into()]);
        GeniosAdapter::new(dbmap)
    }

    #[test]
    fn decodes_document() {
        let doc = document();
        assert_eq!(doc.id, "123");
        assert_eq!(doc.db, "ZECO");
        assert_eq!(doc.id_name, "ZECO__123");
        assert_eq!(doc.authors.items.len(), 2);
        assert!(doc.text.starts_with("Die Kosten & der Nutzen von Planung werden"));
        assert_eq!(doc.modules.items, vec!["WIWI", "FZS"]);
    }

    #[test]
    fn converts_document() {
        let record = adapter().convert(document()).unwrap();
        assert_eq!(record.id, "ai-48-WkVDT19fMTIz");
        assert_eq!(record.record_id, "123");
        assert_eq!(record.url, vec!["https://www.wiso-net.de/document/ZECO__123"]);
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2015, 1, 1));
        assert_eq!(record.journal_title, "Zeitschrift für Controlling");
        assert_eq!(record.issn, vec!["0340-1650"]);
        assert_eq!(record.volume, "27");
        assert!(record.issue.is_empty());
        assert_eq!(
            record.authors,
            vec![Author::named("Müller, Hans"), Author::named("Meier, Eva")]
        );
        assert_eq!(record.abstract_text, record.fulltext);
        assert!(record.abstract_text.starts_with("Die Kosten & der Nutzen"));
        assert_eq!(record.subjects, vec!["Controlling", "Kosten", "Planung"]);
        assert_eq!(record.languages, vec!["deu"]);
        assert_eq!(record.ref_type, "EJOUR");
    }

    #[test]
    fn packages_and_collection() {
        let record = adapter().convert(document()).unwrap();
        assert_eq!(
            record.packages,
            vec!["ZECO", "Genios (Wiwi)", "Genios (LIT)", "WIWI", "FZS"]
        );
        assert_eq!(record.mega_collections, vec!["Genios (Wiwi)"]);

        let record = GeniosAdapter::default().convert(document()).unwrap();
        assert_eq!(record.mega_collections, vec!["Genios"]);
        assert_eq!(record.packages, vec!["ZECO", "WIWI", "FZS"]);
    }

    #[test]
    fn date_falls_back_to_compact_field() {
        let mut doc = document();
        doc.year = "o.J.".into();
        let record = adapter().convert(doc).unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2015, 3, 1));
    }

    #[test]
    fn no_date_is_a_skip() {
        let mut doc = document();
        doc.year.clear();
        doc.date = "unbekannt".into();
        let rejection = adapter().convert(doc).unwrap_err();
        assert!(rejection.is_skip());
    }

    #[test]
    fn long_title_is_a_skip() {
        let mut doc = document();
        doc.title = "x".repeat(MAX_TITLE_LENGTH + 1);
        let rejection = adapter().convert(doc).unwrap_err();
        assert!(matches!(rejection, Rejection::Skip { ref skip, .. } if skip.reason() == "article title too long"));
    }

    #[test]
    fn long_id_is_a_skip() {
        let mut doc = document();
        doc.source = "S".repeat(300);
        let rejection = adapter().convert(doc).unwrap_err();
        assert!(matches!(rejection, Rejection::Skip { ref skip, .. } if skip.reason() == "id too long"));
    }

    #[test]
    fn missing_id_is_an_error() {
        let mut doc = document();
        doc.id = "  ".into();
        assert!(!adapter().convert(doc).unwrap_err().is_skip());
    }

    #[test]
    fn headings_split_on_separators_first() {
        let doc = Document {
            descriptors: Descriptors {
                items: vec!["Steuern; Recht / Bilanz, Prüfung".into()],
            },
            ..Default::default()
        };
        assert_eq!(doc.headings(), vec!["Steuern", "Recht", "Bilanz, Prüfung"]);
    }

    #[test]
    fn abstract_prefers_declared_one() {
        let mut doc = document();
        doc.abstract_text = "  Kurzfassung ".into();
        doc.text = "ü".repeat(500);
        let record = adapter().convert(doc).unwrap();
        assert_eq!(record.abstract_text, "Kurzfassung");

        let mut doc = document();
        doc.text = "ü".repeat(500);
        let record = adapter().convert(doc).unwrap();
        assert_eq!(record.abstract_text.chars().count(), TEXT_AS_ABSTRACT_CUTOFF);
    }

    #[test]
    fn declared_languages() {
        let doc = Document {
            language: "Deutsch; English, fr, ger".into(),
            ..Default::default()
        };
        assert_eq!(doc.declared_languages(), vec!["deu", "eng"]);
    }

    #[test]
    fn german_text_is_detected() {
        let doc = Document {
            title: "Kosten im Griff".into(),
            text: "Die Bundesregierung hat am Mittwoch beschlossen, dass die Förderung \
                   für kleine und mittlere Unternehmen im kommenden Jahr deutlich \
                   ausgeweitet werden soll."
                .into(),
            language: "English".into(),
            ..Default::default()
        };
        assert_eq!(doc.languages(), vec!["deu"]);
    }

    #[test]
    fn english_text_is_detected() {
        let doc = Document {
            title: "Controlling costs in small and medium sized enterprises".into(),
            text: "The government decided on Wednesday that the support for small and \
                   medium sized companies should be expanded significantly over the \
                   course of the coming year."
                .into(),
            ..Default::default()
        };
        assert_eq!(doc.languages(), vec!["eng"]);
    }

    #[test]
    fn mixed_title_and_text_are_sorted() {
        let doc = Document {
            title: "The government decided to expand the support for small companies".into(),
            text: "Die Bundesregierung hat beschlossen, die Förderung für kleine \
                   Unternehmen im kommenden Jahr deutlich auszuweiten."
                .into(),
            ..Default::default()
        };
        assert_eq!(doc.languages(), vec!["deu", "eng"]);
    }

    #[test]
    fn short_fields_fall_back_to_declared_language() {
        let doc = Document {
            title: "Kosten im Griff".into(),
            language: "Deutsch".into(),
            ..Default::default()
        };
        assert_eq!(doc.languages(), vec!["deu"]);

        let doc = Document {
            title: "Kosten im Griff".into(),
            ..Default::default()
        };
        assert!(doc.languages().is_empty());
    }
}
