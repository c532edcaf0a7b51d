use crate::error::{UploadFailure, UploadFailureResponse};
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use docvault_core::{AppError, UploadResult};
use docvault_services::PipelineError;
use futures::TryStreamExt;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use utoipa::ToSchema;

const FILE_FIELD: &str = "file";
const FALLBACK_ARCHIVE_NAME: &str = "upload.zip";

/// Outcome of a successful upload
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    /// Retrieval path of the last document written, null when the archive held no files
    #[schema(example = "/documents/notes.pdf")]
    pub pdf_url: Option<String>,
    /// Documents written, including ones later overwritten by a same-named entry
    #[schema(example = 2)]
    pub files_uploaded: usize,
}

impl From<UploadResult> for UploadResponse {
    fn from(result: UploadResult) -> Self {
        Self {
            success: result.success,
            pdf_url: result
                .last_written
                .map(|name| format!("/documents/{}", name)),
            files_uploaded: result.count,
        }
    }
}

/// Replace the whole document set with the contents of an archive
#[utoipa::path(
    post,
    path = "/upload",
    tag = "documents",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Archive extracted and document set replaced", body = UploadResponse),
        (status = 400, description = "No usable archive in the request", body = UploadFailureResponse),
        (status = 413, description = "Archive exceeds the upload size limit", body = UploadFailureResponse),
        (status = 500, description = "Archive could not be staged or extracted", body = UploadFailureResponse),
        (status = 503, description = "Another upload is in progress", body = UploadFailureResponse),
        (status = 504, description = "Extraction or swap timed out", body = UploadFailureResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_archive"))]
pub async fn upload_archive(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, UploadFailure> {
    let limit_bytes = state.config.max_upload_size_bytes();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(too_large_message(limit_bytes))
        } else {
            AppError::InvalidInput(format!("Failed to read multipart: {}", e))
        }
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_ARCHIVE_NAME)
            .to_string();
        tracing::debug!(file_name = %file_name, "Receiving archive");

        let body_too_large = AtomicBool::new(false);
        let content = field.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                body_too_large.store(true, Ordering::Relaxed);
            }
            e
        });

        let result = state
            .coordinator
            .process(&file_name, Box::pin(content))
            .await
            .map_err(|err| {
                upload_failure(err, body_too_large.load(Ordering::Relaxed), limit_bytes)
            })?;

        return Ok(Json(UploadResponse::from(result)));
    }

    Err(AppError::InvalidInput(format!(
        "No file provided; send the archive in a multipart field named '{}'",
        FILE_FIELD
    ))
    .into())
}

fn too_large_message(limit_bytes: usize) -> String {
    format!(
        "Archive exceeds the {} MB upload limit",
        limit_bytes / 1024 / 1024
    )
}

/// A body cut off by the size limit reaches the pipeline as a failed stream;
/// report it as 413 instead.
fn upload_failure(err: PipelineError, body_too_large: bool, limit_bytes: usize) -> UploadFailure {
    if body_too_large {
        tracing::warn!(limit_bytes, error = %err, "Upload body exceeded the size limit");
        return AppError::PayloadTooLarge(too_large_message(limit_bytes)).into();
    }
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_upload_response_shape() {
        let written = vec!["report.pdf".to_string(), "notes.pdf".to_string()];
        let body = serde_json::to_value(UploadResponse::from(UploadResult::from_written(&written)))
            .unwrap();

        assert_eq!(
            body,
            serde_json::json!({"success": true, "pdfUrl": "/documents/notes.pdf", "filesUploaded": 2})
        );
    }

    #[test]
    fn test_oversized_body_maps_to_413() {
        let limit = 10 * 1024 * 1024;
        let err = PipelineError::InvalidInput("length limit exceeded".to_string());

        let failure = upload_failure(err, true, limit);
        assert!(matches!(failure.0, AppError::PayloadTooLarge(ref msg) if msg.contains("10 MB")));
        assert_eq!(failure.into_response().status(), StatusCode::PAYLOAD_TOO_LARGE);

        let err = PipelineError::InvalidInput("client went away".to_string());
        let failure = upload_failure(err, false, limit);
        assert!(matches!(failure.0, AppError::InvalidInput(_)));
        assert_eq!(failure.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upload_response_without_documents() {
        let body = serde_json::to_value(UploadResponse::from(UploadResult::from_written(&[])))
            .unwrap();

        assert_eq!(
            body,
            serde_json::json!({"success": true, "pdfUrl": null, "filesUploaded": 0})
        );
    }
}
