//! Bibline Schema - the intermediate record and everything around it
//!
//! Field normalization helpers used by source adapters, global id
//! composition and the exporters that project records onto index schemas.

pub mod export;
pub mod id;
pub mod normalize;
pub mod record;

// Re-exports for convenience
pub use export::{ExportError, ExportFormat, Exporter, IntermediateExporter, SolrExporter};
pub use id::{KEY_LENGTH_LIMIT, checked_id, compose_id, encode_natural_id};
pub use normalize::issn::Issn;
pub use record::{Author, IntermediateRecord};
