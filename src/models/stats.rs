//! Aggregate counters across the whole document table.

use serde::Serialize;

/// Dashboard statistics: row counts per lifecycle stage plus total payload size.
///
/// `processed_documents` and `embedded_documents` only ever grow between
/// uploads, converging on `total_documents` once every lifecycle has run.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub total_documents: i64,
    pub processed_documents: i64,
    pub embedded_documents: i64,
    pub total_size: i64,
}
