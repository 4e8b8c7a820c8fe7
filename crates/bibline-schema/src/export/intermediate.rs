//! Identity exporter: the intermediate record itself as JSON

use super::{ExportError, Exporter};
use crate::record::IntermediateRecord;

#[derive(Debug, Clone, Copy, Default)]
pub struct IntermediateExporter;

impl Exporter for IntermediateExporter {
    fn name(&self) -> &'static str {
        "intermediate"
    }

    fn export(&self, record: &IntermediateRecord) -> Result<Vec<u8>, ExportError> {
        Ok(serde_json::to_vec(record)?)
    }
}
