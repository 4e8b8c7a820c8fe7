//! ISSN validation, canonical formatting and extraction from free text

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

static VALID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{7}[0-9X]$").expect("valid ISSN regex"));

/// ISSN-shaped substrings in running text
static EMBEDDED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{4}-[0-9]{3}[0-9X]").expect("valid ISSN regex"));

/// A syntactically valid ISSN in canonical `NNNN-NNNC` form.
///
/// Validation is structural only (seven digits plus digit or `X`); the check
/// digit is not verified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Issn(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidIssn(pub String);

impl std::fmt::Display for InvalidIssn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid ISSN: {:?}", self.0)
    }
}

impl std::error::Error for InvalidIssn {}

impl Issn {
    /// Accepts `12345678`, `1234-5678`, `1234 567x` and similar spellings.
    pub fn parse(raw: &str) -> Result<Self, InvalidIssn> {
        let compact: String = raw
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != ' ')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if !VALID.is_match(&compact) {
            return Err(InvalidIssn(raw.to_string()));
        }
        Ok(Self(format!("{}-{}", &compact[..4], &compact[4..])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Issn {
    type Err = InvalidIssn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Issn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// All distinct hyphenated ISSNs in `text`, in order of appearance.
pub fn find_issns(text: &str) -> Vec<Issn> {
    let mut found: Vec<Issn> = Vec::new();
    for m in EMBEDDED.find_iter(text) {
        if let Ok(issn) = Issn::parse(m.as_str()) {
            if !found.contains(&issn) {
                found.push(issn);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form() {
        assert_eq!(Issn::parse("12345678").unwrap().as_str(), "1234-5678");
        assert_eq!(Issn::parse(" 1234-567x ").unwrap().as_str(), "1234-567X");
        assert_eq!(Issn::parse("1234 5678").unwrap().to_string(), "1234-5678");
    }

    #[test]
    fn rejects_malformed() {
        for raw in ["", "1234-567", "1234-56789", "X234-5678", "abcd-efgh", "1234–5678"] {
            assert!(Issn::parse(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn from_str_matches_parse() {
        let issn: Issn = "0028-0836".parse().unwrap();
        assert_eq!(issn, Issn::parse("00280836").unwrap());
    }

    #[test]
    fn find_in_text() {
        let found = find_issns("ISSN 0028-0836, eISSN 1476-4687; again 0028-0836");
        let found: Vec<&str> = found.iter().map(Issn::as_str).collect();
        assert_eq!(found, vec!["0028-0836", "1476-4687"]);
    }

    #[test]
    fn find_in_text_without_matches() {
        assert!(find_issns("no identifiers here, 2015-03").is_empty());
    }
}
