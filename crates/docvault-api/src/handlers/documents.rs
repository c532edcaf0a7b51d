use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response, StatusCode},
};
use docvault_core::AppError;
use docvault_storage::DocumentStore;
use futures::StreamExt;
use std::sync::Arc;

const DOCUMENT_EXTENSION: &str = ".pdf";
const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Map a document id to the stored name: `{id}.pdf`, or `id` itself when it
/// already carries the extension (as in the `pdfUrl` returned by an upload).
async fn resolve_document(store: &DocumentStore, id: &str) -> Result<String, HttpAppError> {
    let primary = format!("{}{}", id, DOCUMENT_EXTENSION);
    if store.exists(&primary).await? {
        return Ok(primary);
    }

    if id.to_lowercase().ends_with(DOCUMENT_EXTENSION) && store.exists(id).await? {
        return Ok(id.to_string());
    }

    Err(AppError::NotFound("Document not found".to_string()).into())
}

/// Download a document as PDF
#[utoipa::path(
    get,
    path = "/documents/{id}",
    tag = "documents",
    params(
        ("id" = String, Path, description = "Document id; the stored file is `{id}.pdf`")
    ),
    responses(
        (status = 200, description = "Document file", content_type = "application/pdf"),
        (status = 400, description = "Invalid document id", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(document_id = %id, operation = "get_document"))]
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response<Body>, HttpAppError> {
    let file_name = resolve_document(&state.store, &id).await?;
    let document = state.store.read_stream(&file_name).await?;

    tracing::debug!(
        file_name = %file_name,
        size_bytes = document.size,
        "Streaming document"
    );

    let body_stream = document.stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Document stream error: {}", e)))
    });

    let content_disposition = format!("attachment; filename=\"{}\"", file_name);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, PDF_CONTENT_TYPE)
        .header(header::CONTENT_LENGTH, document.size)
        .header(header::CONTENT_DISPOSITION, content_disposition.as_str())
        .body(Body::from_stream(body_stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}
