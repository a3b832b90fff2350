//! DocumentService — metadata CRUD backed by SQLite plus local-disk payload
//! storage. Uploaded bytes land under `base_path/{filename}`; everything the
//! API serves back comes from the `documents` table.

use crate::models::{document::Document, document::FileType, stats::DocumentStats};
use bytes::Bytes;
use chrono::Utc;
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::PathBuf,
    sync::Arc,
};
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

/// Preview length in characters, matching the dashboard's snippet width.
const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document `{0}` not found")]
    DocumentNotFound(Uuid),
    #[error("no file was uploaded")]
    MissingFile,
    #[error("unsupported file type `{0}`; only json, pdf, and txt are accepted")]
    UnsupportedFileType(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type DocumentResult<T> = Result<T, DocumentError>;

/// DocumentService provides the persistence half of the system:
/// - Create a document (writes bytes to disk, inserts the metadata row)
/// - Get one / list all (newest-first)
/// - Delete (removes payload then row)
/// - Aggregate stats for the dashboard
///
/// Lifecycle progression is not handled here; see `services::lifecycle`.
#[derive(Clone)]
pub struct DocumentService {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Directory on disk where document payloads are stored.
    pub base_path: PathBuf,
}

impl DocumentService {
    /// Create a new DocumentService backed by the provided SQLite pool and
    /// using `base_path` as the upload directory.
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Derive the storage filename for an upload.
    ///
    /// Mirrors the classic `{millis}-{original name}` disk-storage convention,
    /// with path separators stripped from the client-supplied name so the
    /// payload can never escape `base_path`.
    fn storage_filename(name: &str) -> String {
        let safe: String = name
            .chars()
            .filter(|c| !matches!(c, '/' | '\\') && !c.is_control())
            .collect();
        format!("{}-{}", Utc::now().timestamp_millis(), safe)
    }

    fn payload_path(&self, filename: &str) -> PathBuf {
        self.base_path.join(filename)
    }

    /// Write payload bytes durably: temp file, fsync, atomic rename.
    async fn write_payload(&self, filename: &str, bytes: &Bytes) -> DocumentResult<PathBuf> {
        fs::create_dir_all(&self.base_path).await?;
        let final_path = self.payload_path(filename);
        let tmp_path = self.base_path.join(format!(".tmp-{}", Uuid::new_v4()));

        let mut file = fs::File::create(&tmp_path).await?;
        let write_result = async {
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, &final_path).await
        }
        .await;

        if let Err(err) = write_result {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(DocumentError::Io(err));
        }
        Ok(final_path)
    }

    /// Store an uploaded file and create its metadata record.
    ///
    /// - Validates the extension server-side (json/pdf/txt only).
    /// - Writes the payload to disk before touching the database.
    /// - Computes a preview (first 200 characters) for text-like types.
    /// - Inserts the row with `processed = 0`, `embedding = 0`, no vector id.
    ///
    /// On insert failure the freshly written payload is removed again so disk
    /// and database never disagree about which documents exist.
    pub async fn create_document(&self, name: &str, bytes: Bytes) -> DocumentResult<Document> {
        if name.trim().is_empty() {
            return Err(DocumentError::MissingFile);
        }

        let extension = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        let file_type = FileType::from_extension(extension)
            .ok_or_else(|| DocumentError::UnsupportedFileType(extension.to_ascii_lowercase()))?;

        let filename = Self::storage_filename(name);
        let size = bytes.len() as i64;
        let preview = if file_type.has_preview() {
            let text = String::from_utf8_lossy(&bytes);
            Some(text.chars().take(PREVIEW_CHARS).collect::<String>())
        } else {
            None
        };

        let payload_path = self.write_payload(&filename, &bytes).await?;

        let insert_result = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (
                id, name, filename, file_type, size, created_at,
                preview, processed, embedding, vector_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, 0, 0, NULL)
            RETURNING id, name, filename, file_type, size, created_at,
                      preview, processed, embedding, vector_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(&filename)
        .bind(file_type)
        .bind(size)
        .bind(Utc::now())
        .bind(preview)
        .fetch_one(&*self.db)
        .await;

        match insert_result {
            Ok(doc) => Ok(doc),
            Err(err) => {
                let _ = fs::remove_file(&payload_path).await;
                Err(DocumentError::Sqlx(err))
            }
        }
    }

    /// Fetch a single document by id.
    ///
    /// Returns DocumentNotFound if missing.
    pub async fn get_document(&self, id: Uuid) -> DocumentResult<Document> {
        sqlx::query_as::<_, Document>(
            "SELECT id, name, filename, file_type, size, created_at,
                    preview, processed, embedding, vector_id
             FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => DocumentError::DocumentNotFound(id),
            other => DocumentError::Sqlx(other),
        })
    }

    /// List every document, newest upload first.
    pub async fn list_documents(&self) -> DocumentResult<Vec<Document>> {
        let docs = sqlx::query_as::<_, Document>(
            "SELECT id, name, filename, file_type, size, created_at,
                    preview, processed, embedding, vector_id
             FROM documents ORDER BY created_at DESC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(docs)
    }

    /// Delete a document: payload first (best effort), then the row.
    ///
    /// A missing payload file is only a debug log; the row removal is what
    /// makes the document disappear from the API. Any lifecycle stage still
    /// pending for this id will find no row and discard its write.
    pub async fn delete_document(&self, id: Uuid) -> DocumentResult<Document> {
        let document = self.get_document(id).await?;

        let payload_path = self.payload_path(&document.filename);
        match fs::remove_file(&payload_path).await {
            Ok(_) => debug!("removed payload {}", payload_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("payload {} already missing", payload_path.display());
            }
            Err(err) => return Err(DocumentError::Io(err)),
        }

        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DocumentError::DocumentNotFound(id));
        }

        Ok(document)
    }

    /// Aggregate counts and total payload size across all documents.
    pub async fn stats(&self) -> DocumentResult<DocumentStats> {
        let (total_documents, total_size) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM documents",
        )
        .fetch_one(&*self.db)
        .await?;

        let processed_documents =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM documents WHERE processed = 1")
                .fetch_one(&*self.db)
                .await?;

        let embedded_documents =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM documents WHERE embedding = 1")
                .fetch_one(&*self.db)
                .await?;

        Ok(DocumentStats {
            total_documents,
            processed_documents,
            embedded_documents,
            total_size,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::test_service;
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn upload_creates_unprocessed_record_with_preview() {
        let service = test_service().await;
        let doc = service
            .create_document("notes.txt", Bytes::from_static(b"hello world"))
            .await
            .unwrap();

        assert_eq!(doc.name, "notes.txt");
        assert_eq!(doc.file_type, FileType::Txt);
        assert_eq!(doc.size, 11);
        assert!(!doc.processed);
        assert!(!doc.embedding);
        assert!(doc.vector_id.is_none());
        assert_eq!(doc.preview.as_deref(), Some("hello world"));

        // payload lands on disk under the storage filename
        let payload = fs::read(service.base_path.join(&doc.filename)).await.unwrap();
        assert_eq!(payload, b"hello world");
    }

    #[tokio::test]
    async fn preview_is_truncated_to_200_characters() {
        let service = test_service().await;
        let content = "x".repeat(500);
        let doc = service
            .create_document("big.txt", Bytes::from(content))
            .await
            .unwrap();
        assert_eq!(doc.preview.map(|p| p.chars().count()), Some(200));
    }

    #[tokio::test]
    async fn pdf_uploads_have_no_preview() {
        let service = test_service().await;
        let doc = service
            .create_document("paper.pdf", Bytes::from_static(b"%PDF-1.7 ..."))
            .await
            .unwrap();
        assert_eq!(doc.file_type, FileType::Pdf);
        assert!(doc.preview.is_none());
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected_without_side_effects() {
        let service = test_service().await;
        let err = service
            .create_document("malware.exe", Bytes::from_static(b"MZ"))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedFileType(ext) if ext == "exe"));

        assert!(service.list_documents().await.unwrap().is_empty());
        let mut entries = fs::read_dir(&service.base_path).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let service = test_service().await;
        let first = service
            .create_document("a.txt", Bytes::from_static(b"a"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = service
            .create_document("b.txt", Bytes::from_static(b"b"))
            .await
            .unwrap();

        let listed = service.list_documents().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let service = test_service().await;
        let err = service.get_document(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DocumentError::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn delete_removes_row_and_payload() {
        let service = test_service().await;
        let doc = service
            .create_document("gone.json", Bytes::from_static(b"{}"))
            .await
            .unwrap();
        let payload_path = service.base_path.join(&doc.filename);
        assert!(fs::try_exists(&payload_path).await.unwrap());

        service.delete_document(doc.id).await.unwrap();

        assert!(!fs::try_exists(&payload_path).await.unwrap());
        let err = service.get_document(doc.id).await.unwrap_err();
        assert!(matches!(err, DocumentError::DocumentNotFound(_)));

        // idempotency: the second delete reports not-found
        let err = service.delete_document(doc.id).await.unwrap_err();
        assert!(matches!(err, DocumentError::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn stats_track_counts_and_total_size() {
        let service = test_service().await;
        service
            .create_document("a.txt", Bytes::from_static(b"12345"))
            .await
            .unwrap();
        service
            .create_document("b.pdf", Bytes::from_static(b"1234567"))
            .await
            .unwrap();

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.total_documents, 2);
        assert_eq!(stats.processed_documents, 0);
        assert_eq!(stats.embedded_documents, 0);
        assert_eq!(stats.total_size, 12);
    }

    #[tokio::test]
    async fn stats_on_empty_store_are_all_zero() {
        let service = test_service().await;
        let stats = service.stats().await.unwrap();
        assert_eq!(stats.total_documents, 0);
        assert_eq!(stats.total_size, 0);
    }
}
