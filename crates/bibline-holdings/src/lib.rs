//! Bibline Holdings - which institution may access which article
//!
//! OVID style holdings files, moving wall arithmetic and labeling of
//! converted records with the ISIL of the holding institution.

pub mod embargo;
pub mod index;
pub mod label;
pub mod ovid;

// Re-exports for convenience
pub use embargo::{EmbargoError, parse_delay, resolve_delay};
pub use index::HoldingsIndex;
pub use label::Labeler;
pub use ovid::{Bound, CoverageError, Entitlement, Holding};
