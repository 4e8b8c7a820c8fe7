//! Classification of raw identifier strings into URL, ISSN or DOI

use std::sync::LazyLock;

use regex::Regex;

use super::issn::Issn;

/// DOI resolver links: the DOI is everything after the host
static DOI_RESOLVER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:https?://(?:dx\.)?doi\.org/)(10\..+)$").expect("valid DOI regex")
});

static BARE_DOI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^10\.[0-9]{4,9}/\S+$").expect("valid DOI regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Url(String),
    Issn(Issn),
    Doi(String),
}

/// Classify one raw identifier. Anything unrecognized is `None`.
///
/// Resolver links are DOIs, not URLs; `urn:ISSN:` prefixes and bare ISSNs
/// are ISSNs. `urn:ISBN:`, handles and the like are dropped.
pub fn classify(raw: &str) -> Option<Identifier> {
    let s = raw.trim();
    if let Some(caps) = DOI_RESOLVER.captures(s) {
        return Some(Identifier::Doi(caps[1].to_string()));
    }
    if s.starts_with("http://") || s.starts_with("https://") {
        return Some(Identifier::Url(s.to_string()));
    }
    if let Some(rest) = s.strip_prefix("urn:ISSN:") {
        return Issn::parse(rest).ok().map(Identifier::Issn);
    }
    if let Some(rest) = s.strip_prefix("doi:") {
        let rest = rest.trim();
        return BARE_DOI.is_match(rest).then(|| Identifier::Doi(rest.to_string()));
    }
    if BARE_DOI.is_match(s) {
        return Some(Identifier::Doi(s.to_string()));
    }
    Issn::parse(s).ok().map(Identifier::Issn)
}

/// Identifiers of one record, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identifiers {
    pub urls: Vec<String>,
    pub issns: Vec<Issn>,
    /// First DOI seen
    pub doi: Option<String>,
}

impl Identifiers {
    pub fn classify_all<'a>(raw: impl IntoIterator<Item = &'a str>) -> Self {
        let mut out = Self::default();
        for s in raw {
            match classify(s) {
                Some(Identifier::Url(url)) => out.urls.push(url),
                Some(Identifier::Issn(issn)) => out.issns.push(issn),
                Some(Identifier::Doi(doi)) => {
                    if out.doi.is_none() {
                        out.doi = Some(doi);
                    }
                }
                None => log::trace!("unclassified identifier: {s}"),
            }
        }
        out
    }
}
