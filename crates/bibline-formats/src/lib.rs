//! Bibline Formats - source adapters
//!
//! One [`SourceAdapter`] per upstream format, each mapping raw records onto
//! the intermediate schema, plus the JSON lookup tables they consult.

pub mod adapter;
pub mod crossref;
pub mod genderopen;
pub mod genios;
pub mod tables;

// Re-exports for convenience
pub use adapter::{Format, FramedDecoder, Framing, SourceAdapter};
pub use crossref::CrossrefAdapter;
pub use genderopen::GenderOpenAdapter;
pub use genios::GeniosAdapter;
pub use tables::{ConfigError, MemberNames, StringListMap, load_json, load_string_list_map};
