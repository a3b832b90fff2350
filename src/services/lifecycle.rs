//! LifecycleEngine — drives each new document through the two-stage
//! processing/embedding simulation as a detached background task.
//!
//! Stage 1 waits the configured processing delay, then flips `processed`.
//! Stage 2 waits the embedding delay, then flips `embedding` and assigns a
//! fresh vector id. The stages are sequenced inside one task, so the stage-2
//! write can never land before stage 1's. If the document is deleted while a
//! stage is pending, the UPDATE simply matches no row and the stage is
//! discarded.

use sqlx::SqlitePool;
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct LifecycleEngine {
    db: Arc<SqlitePool>,
    processing_delay: Duration,
    embedding_delay: Duration,
}

impl LifecycleEngine {
    pub fn new(
        db: Arc<SqlitePool>,
        processing_delay: Duration,
        embedding_delay: Duration,
    ) -> Self {
        Self {
            db,
            processing_delay,
            embedding_delay,
        }
    }

    /// Launch the lifecycle for a freshly created document.
    ///
    /// Fire and forget: the caller returns immediately, the task is never
    /// joined, and there is no cancellation handle. Failures are logged and
    /// never surfaced to the uploading client.
    pub fn spawn(&self, id: Uuid) {
        let engine = self.clone();
        tokio::spawn(async move {
            if let Err(err) = engine.run(id).await {
                warn!("lifecycle for document {} failed: {}", id, err);
            }
        });
    }

    /// Run both stages in order for one document.
    ///
    /// A vanished row (deleted mid-flight) ends the lifecycle quietly; only
    /// database errors propagate to the spawn wrapper's log line.
    pub async fn run(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sleep(self.processing_delay).await;

        let result = sqlx::query("UPDATE documents SET processed = 1 WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            debug!("document {} deleted before processing stage", id);
            return Ok(());
        }
        info!("document {} processed", id);

        sleep(self.embedding_delay).await;

        // The `processed = 1` guard keeps the invariant even if this write
        // were ever issued out of order.
        let vector_id = Uuid::new_v4();
        let result = sqlx::query(
            "UPDATE documents SET embedding = 1, vector_id = ? WHERE id = ? AND processed = 1",
        )
        .bind(vector_id)
        .bind(id)
        .execute(&*self.db)
        .await?;
        if result.rows_affected() == 0 {
            debug!("document {} deleted before embedding stage", id);
            return Ok(());
        }
        info!("document {} embedded as vector {}", id, vector_id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::document_service::test_support::test_service;
    use bytes::Bytes;

    fn engine(service: &crate::services::document_service::DocumentService) -> LifecycleEngine {
        LifecycleEngine::new(
            service.db.clone(),
            Duration::from_millis(40),
            Duration::from_millis(40),
        )
    }

    #[tokio::test]
    async fn lifecycle_advances_through_both_stages() {
        let service = test_service().await;
        let doc = service
            .create_document("a.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        engine(&service).run(doc.id).await.unwrap();

        let doc = service.get_document(doc.id).await.unwrap();
        assert!(doc.processed);
        assert!(doc.embedding);
        assert!(doc.vector_id.is_some());
    }

    #[tokio::test]
    async fn stage_one_completes_before_stage_two_starts() {
        let service = test_service().await;
        let doc = service
            .create_document("a.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        let engine = engine(&service);
        let handle = {
            let engine = engine.clone();
            let id = doc.id;
            tokio::spawn(async move { engine.run(id).await })
        };

        // Sample between the two stage writes.
        sleep(Duration::from_millis(60)).await;
        let mid = service.get_document(doc.id).await.unwrap();
        assert!(mid.processed);
        assert!(!mid.embedding);
        assert!(mid.vector_id.is_none());

        handle.await.unwrap().unwrap();
        let done = service.get_document(doc.id).await.unwrap();
        assert!(done.embedding);
        assert!(done.vector_id.is_some());
    }

    #[tokio::test]
    async fn vector_ids_are_unique_per_document() {
        let service = test_service().await;
        let engine = engine(&service);

        let a = service
            .create_document("a.txt", Bytes::from_static(b"a"))
            .await
            .unwrap();
        let b = service
            .create_document("b.txt", Bytes::from_static(b"b"))
            .await
            .unwrap();
        engine.run(a.id).await.unwrap();
        engine.run(b.id).await.unwrap();

        let a = service.get_document(a.id).await.unwrap();
        let b = service.get_document(b.id).await.unwrap();
        assert_ne!(a.vector_id.unwrap(), b.vector_id.unwrap());
    }

    #[tokio::test]
    async fn deleting_before_stage_one_discards_the_lifecycle() {
        let service = test_service().await;
        let doc = service
            .create_document("a.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        service.delete_document(doc.id).await.unwrap();
        // Both stage writes become lookup misses; run still returns Ok.
        engine(&service).run(doc.id).await.unwrap();

        assert!(service.list_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_between_stages_does_not_resurrect_the_document() {
        let service = test_service().await;
        let doc = service
            .create_document("a.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        let engine = engine(&service);
        let handle = {
            let engine = engine.clone();
            let id = doc.id;
            tokio::spawn(async move { engine.run(id).await })
        };

        sleep(Duration::from_millis(60)).await;
        assert!(service.get_document(doc.id).await.unwrap().processed);
        service.delete_document(doc.id).await.unwrap();

        handle.await.unwrap().unwrap();
        assert!(service.list_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lifecycles_of_different_documents_are_independent() {
        let service = test_service().await;
        let engine = engine(&service);

        let a = service
            .create_document("a.txt", Bytes::from_static(b"a"))
            .await
            .unwrap();
        let b = service
            .create_document("b.txt", Bytes::from_static(b"b"))
            .await
            .unwrap();
        engine.spawn(a.id);
        engine.spawn(b.id);

        // Delete A before its embedding stage fires.
        sleep(Duration::from_millis(60)).await;
        service.delete_document(a.id).await.unwrap();

        sleep(Duration::from_millis(120)).await;
        let b = service.get_document(b.id).await.unwrap();
        assert!(b.processed);
        assert!(b.embedding);
        assert!(b.vector_id.is_some());
        assert!(matches!(
            service.get_document(a.id).await,
            Err(crate::services::document_service::DocumentError::DocumentNotFound(_))
        ));
    }
}
