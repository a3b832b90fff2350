//! HTTP handlers for the document API.
//! Thin request/response mapping over `DocumentService`; the only extra step
//! is handing freshly created ids to the `LifecycleEngine`.

use crate::{AppState, errors::AppError, models::document::Document};
use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

/// Body of `POST /api/upload`: the created record in its initial state.
#[derive(Serialize, Debug)]
pub struct UploadResponse {
    pub success: bool,
    pub file: Document,
}

#[derive(Serialize, Debug)]
pub struct ListResponse {
    pub documents: Vec<Document>,
}

#[derive(Serialize, Debug)]
pub struct GetResponse {
    pub document: Document,
}

#[derive(Serialize, Debug)]
pub struct DeleteResponse {
    pub success: bool,
}

/// POST `/api/upload` — multipart upload, file under the `file` field.
///
/// Returns the record immediately with `processed` and `embedding` still
/// false; the lifecycle runs detached and is observed by polling.
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("invalid multipart body: {}", err)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::bad_request("upload field is missing a filename"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::bad_request(format!("failed to read upload: {}", err)))?;
        upload = Some((name, bytes));
        break;
    }

    let (name, bytes) = upload.ok_or_else(|| AppError::bad_request("no file was uploaded"))?;
    let document = state.documents.create_document(&name, bytes).await?;

    state.lifecycle.spawn(document.id);

    Ok(Json(UploadResponse {
        success: true,
        file: document,
    }))
}

/// GET `/api/documents` — every document, newest first.
pub async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<ListResponse>, AppError> {
    let documents = state.documents.list_documents().await?;
    Ok(Json(ListResponse { documents }))
}

/// GET `/api/document/{id}` — fetch one document; 404 if absent.
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GetResponse>, AppError> {
    let document = state.documents.get_document(id).await?;
    Ok(Json(GetResponse { document }))
}

/// DELETE `/api/delete/{id}` — remove payload and record; 404 if absent.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    state.documents.delete_document(id).await?;
    Ok(Json(DeleteResponse { success: true }))
}

/// GET `/api/stats` — aggregate dashboard counters.
pub async fn document_stats(
    State(state): State<AppState>,
) -> Result<Json<crate::models::stats::DocumentStats>, AppError> {
    let stats = state.documents.stats().await?;
    Ok(Json(stats))
}
