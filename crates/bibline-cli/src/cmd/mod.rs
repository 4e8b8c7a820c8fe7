//! Subcommand implementations

pub mod convert;
pub mod formats;
pub mod holdings;
