use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::header;
use tracing::{debug, instrument};

use crate::error::{AppError, ErrorBody};
use crate::ingest::{IncomingFile, SpoolSettings, Spooler, UploadRequest};
use crate::models::upload::{UploadListQuery, UploadRecordResponse, UploadResponse};
use crate::state::AppState;

pub fn upload_body_limit(max_request_size: usize) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max_request_size)
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "Uploads",
    operation_id = "uploadImage",
    summary = "Upload an image",
    description = "Relays one image to the configured blob store and records a pointer to it. \
        The `file` multipart field is required. An optional `folder` field overrides the \
        default folder. Uploading the same asset again refreshes its record instead of \
        adding a second one.",
    request_body(content_type = "multipart/form-data", description = "Image file with optional folder"),
    responses(
        (status = 200, description = "Image stored and recorded", body = UploadResponse),
        (status = 400, description = "Rejected upload (MissingFile, TooLarge, UnsupportedType, LengthMismatch, ContentMismatch, InvalidFolder, TransportError)", body = ErrorBody),
        (status = 500, description = "Storage or metadata failure (StorageError, RepositoryError, InternalError)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let request = read_upload_request(&mut multipart, &state.spool).await?;

    // Detached so a client disconnect cannot split a stored blob from its record.
    let pipeline = Arc::clone(&state.pipeline);
    let receipt = tokio::spawn(async move { pipeline.ingest(request).await })
        .await
        .map_err(|e| AppError::Internal(format!("Ingest task failed: {e}")))??;

    Ok(Json(UploadResponse::from(receipt)))
}

#[utoipa::path(
    get,
    path = "/uploads",
    tag = "Uploads",
    operation_id = "listUploads",
    summary = "List uploaded images",
    description = "Returns upload records ordered by upload time, newest first.",
    params(UploadListQuery),
    responses(
        (status = 200, description = "Upload records", body = Vec<UploadRecordResponse>),
        (status = 500, description = "Repository failure (RepositoryError)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_uploads(
    State(state): State<AppState>,
    Query(query): Query<UploadListQuery>,
) -> Result<Json<Vec<UploadRecordResponse>>, AppError> {
    let records = state.uploads.list(query.page()).await?;
    Ok(Json(
        records.into_iter().map(UploadRecordResponse::from).collect(),
    ))
}

/// Read the `file` and `folder` fields. Unknown fields and extra files are skipped.
async fn read_upload_request(
    multipart: &mut Multipart,
    spool: &SpoolSettings,
) -> Result<UploadRequest, AppError> {
    let mut request = UploadRequest::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            // The body limit trips while an oversized file is drained; the
            // file is already known to be too large, so let validation say so.
            Err(e) if request
                .file
                .as_ref()
                .is_some_and(|f| f.declared_len > spool.max_size) =>
            {
                debug!("Stopped reading oversized upload: {e}");
                break;
            }
            Err(e) => return Err(AppError::Transport(format!("Multipart error: {e}"))),
        };

        match field.name() {
            Some("file") if request.file.is_none() => {
                request.file = Some(spool_file(field, spool).await?);
            }
            Some("folder") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Transport(format!("Failed to read folder: {e}")))?;
                request.folder = Some(text);
            }
            _ => {}
        }
    }

    Ok(request)
}

async fn spool_file(mut field: Field<'_>, settings: &SpoolSettings) -> Result<IncomingFile, AppError> {
    let file_name = field.file_name().map(|s| s.to_string());
    let content_type = field.content_type().map(|s| s.to_string()).or_else(|| {
        file_name
            .as_deref()
            .and_then(|name| mime_guess::from_path(name).first())
            .map(|mime| mime.to_string())
    });
    let announced_len = field
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    let mut spooler = Spooler::new(settings.clone());
    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => spooler
                .push(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to spool upload: {e}")))?,
            Ok(None) => break,
            Err(e) if spooler.overflowed() => {
                debug!("Stopped reading oversized upload: {e}");
                break;
            }
            Err(e) => return Err(AppError::Transport(format!("Upload read error: {e}"))),
        }
    }

    let received = spooler.received();
    let declared_len = match announced_len {
        Some(len) if !spooler.overflowed() => len,
        Some(len) => len.max(received),
        None => received,
    };
    let body = spooler
        .finish()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to spool upload: {e}")))?;

    Ok(IncomingFile {
        body,
        content_type,
        file_name,
        declared_len,
    })
}
