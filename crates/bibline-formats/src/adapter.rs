//! The adapter contract and the registry of supported formats

use std::io::BufRead;
use std::str::FromStr;

use bibline_core::{
    JsonLinesDecoder, MalformedElement, Outcome, RecordDecoder, StreamError, XmlElementDecoder,
};
use bibline_schema::IntermediateRecord;
use serde::de::DeserializeOwned;

use crate::tables::ConfigError;

/// How raw records are cut out of a byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// One JSON document per line
    JsonLines,
    /// Repeating elements with this local name
    XmlElements(&'static str),
}

/// Converts one source format to intermediate records.
///
/// `convert` must be pure with respect to the adapter: lookup tables are
/// read-only and any per-record accumulation stays local to the call.
pub trait SourceAdapter: Send + Sync {
    type Raw: DeserializeOwned + Send;

    const SOURCE_ID: &'static str;
    const FRAMING: Framing;

    fn convert(&self, raw: Self::Raw) -> Outcome<IntermediateRecord>;

    /// Decoder for this adapter's framing over `reader`
    fn decoder<R: BufRead>(&self, reader: R) -> FramedDecoder<R, Self::Raw> {
        FramedDecoder::new(reader, Self::FRAMING)
    }
}

/// Decoder for either framing, so callers stay generic over one type.
pub enum FramedDecoder<R, T> {
    Json(JsonLinesDecoder<R, T>),
    Xml(XmlElementDecoder<R, T>),
}

impl<R: BufRead, T: DeserializeOwned> FramedDecoder<R, T> {
    /// Malformed XML elements are fatal for conversion input.
    pub fn new(reader: R, framing: Framing) -> Self {
        match framing {
            Framing::JsonLines => Self::Json(JsonLinesDecoder::new(reader)),
            Framing::XmlElements(name) => {
                Self::Xml(XmlElementDecoder::new(reader, name, MalformedElement::Fatal))
            }
        }
    }
}

impl<R: BufRead, T: DeserializeOwned> Iterator for FramedDecoder<R, T> {
    type Item = Result<T, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Json(d) => d.next(),
            Self::Xml(d) => d.next(),
        }
    }
}

impl<R: BufRead, T: DeserializeOwned> RecordDecoder<T> for FramedDecoder<R, T> {
    fn malformed(&self) -> usize {
        match self {
            Self::Json(d) => d.malformed(),
            Self::Xml(d) => d.malformed(),
        }
    }
}

/// Supported input formats, as named on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Crossref,
    Genios,
    GenderOpen,
}

impl Format {
    pub const ALL: [Format; 3] = [Self::Crossref, Self::Genios, Self::GenderOpen];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Crossref => "crossref",
            Self::Genios => "genios",
            Self::GenderOpen => "genderopen",
        }
    }

    pub fn source_id(self) -> &'static str {
        match self {
            Self::Crossref => crate::crossref::CrossrefAdapter::SOURCE_ID,
            Self::Genios => crate::genios::GeniosAdapter::SOURCE_ID,
            Self::GenderOpen => crate::genderopen::GenderOpenAdapter::SOURCE_ID,
        }
    }

    pub fn framing(self) -> Framing {
        match self {
            Self::Crossref => crate::crossref::CrossrefAdapter::FRAMING,
            Self::Genios => crate::genios::GeniosAdapter::FRAMING,
            Self::GenderOpen => crate::genderopen::GenderOpenAdapter::FRAMING,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Crossref => "Crossref works API dump, JSON lines",
            Self::Genios => "Genios full-text XML, <Document> elements",
            Self::GenderOpen => "GenderOpen OAI-DC XML, <Record> elements",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownFormat(s.to_string()))
    }
}
