//! Defines routes for the document API and health probes.
//!
//! ## Structure
//! - **Document endpoints**
//!   - `POST   /api/upload`        — multipart upload (field `file`)
//!   - `GET    /api/documents`     — list all documents, newest first
//!   - `GET    /api/document/{id}` — fetch one document
//!   - `DELETE /api/delete/{id}`   — remove a document and its payload
//!   - `GET    /api/stats`         — aggregate counters
//!
//! - **Probes**
//!   - `GET /healthz` — liveness
//!   - `GET /readyz`  — readiness (DB + disk)

use crate::{
    AppState,
    handlers::{
        document_handlers::{
            delete_document, document_stats, get_document, list_documents, upload_document,
        },
        health_handlers::{healthz, readyz},
    },
};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Build the router for the whole HTTP surface.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // document API
        .route("/api/upload", post(upload_document))
        .route("/api/documents", get(list_documents))
        .route("/api/document/{id}", get(get_document))
        .route("/api/delete/{id}", delete(delete_document))
        .route("/api/stats", get(document_stats))
}
