//! Output exporters: project an intermediate record onto an index schema

pub mod intermediate;
pub mod solr;

use std::str::FromStr;

use serde::Deserialize;

use crate::record::IntermediateRecord;

pub use intermediate::IntermediateExporter;
pub use solr::{SolrDocument, SolrExporter};

/// Error types for export operations
#[derive(Debug)]
pub enum ExportError {
    /// Serialization failed
    Json(serde_json::Error),
    /// Record lacks a field the target schema requires
    MissingField(&'static str),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(e) => write!(f, "JSON error: {e}"),
            Self::MissingField(name) => write!(f, "missing required field: {name}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::MissingField(_) => None,
        }
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// A pure projection from [`IntermediateRecord`] to one output document.
///
/// Exporters are shared across rayon workers, hence `Sync`.
pub trait Exporter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Serialized document, one JSON object without trailing newline
    fn export(&self, record: &IntermediateRecord) -> Result<Vec<u8>, ExportError>;
}

/// Exporter selection, as named on the command line and in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Intermediate,
    Solr,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 2] = [Self::Intermediate, Self::Solr];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Intermediate => "intermediate",
            Self::Solr => "solr",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown export format {s:?} (expected: intermediate, solr)")
            })
    }
}
