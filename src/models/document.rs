//! The document metadata record and its file-type enum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Supported upload types, derived from the lower-cased filename extension.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum FileType {
    Json,
    Pdf,
    Txt,
}

impl FileType {
    /// Parse a filename extension (without the dot). Case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    /// Whether a text preview is computed for this type.
    pub fn has_preview(self) -> bool {
        matches!(self, Self::Json | Self::Txt)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Json => "json",
            Self::Pdf => "pdf",
            Self::Txt => "txt",
        };
        f.write_str(s)
    }
}

/// Metadata for a single uploaded document.
///
/// The record stores metadata only; the payload bytes live on disk under the
/// service's upload directory, keyed by `filename`. Everything except the two
/// lifecycle flags and `vector_id` is immutable after creation.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique identifier, generated at creation and never reused.
    pub id: Uuid,

    /// Original filename as uploaded by the client.
    pub name: String,

    /// On-disk storage name (timestamp-prefixed, may differ from `name`).
    pub filename: String,

    /// Detected file type (json, pdf, or txt).
    pub file_type: FileType,

    /// Payload size in bytes.
    pub size: i64,

    /// When the document was uploaded.
    pub created_at: DateTime<Utc>,

    /// First 200 characters of content for txt/json uploads; absent for pdf.
    pub preview: Option<String>,

    /// Set by stage 1 of the lifecycle.
    pub processed: bool,

    /// Set by stage 2 of the lifecycle, together with `vector_id`.
    pub embedding: bool,

    /// Placeholder vector-store reference, assigned when `embedding` flips.
    pub vector_id: Option<Uuid>,
}
