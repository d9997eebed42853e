//! Media endpoints

use axum::{
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::Json,
};

use crate::AppState;
use crate::api::dto::MediaUploadResponse;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::metrics::HTTP_REQUEST_DURATION_SECONDS;
use crate::service::MediaService;

/// Multipart field carrying the file
const FILE_FIELD: &str = "file";

fn file_too_large(max_size: usize) -> AppError {
    AppError::BadRequest(format!("File too large: exceeds {} bytes", max_size))
}

/// Map a multipart read error. Hitting the body limit is a `BadRequest`
/// like any other oversized file.
fn multipart_error(error: MultipartError, context: &str, max_size: usize) -> AppError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        file_too_large(max_size)
    } else {
        AppError::Validation(format!("{}: {}", context, error))
    }
}

/// POST /medias
pub async fn upload_media(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<MediaUploadResponse>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/medias"])
        .start_timer();

    let mut multipart = multipart
        .map_err(|e| AppError::Validation(format!("Failed to parse multipart: {}", e)))?;
    let max_size = state.storage.max_upload_bytes();

    let mut upload: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "Failed to parse multipart", max_size))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(ToOwned::to_owned);
        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, "Failed to read file", max_size))?
        {
            if bytes.len() + chunk.len() > max_size {
                return Err(file_too_large(max_size));
            }
            bytes.extend_from_slice(&chunk);
        }

        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) = upload.ok_or_else(|| {
        AppError::Validation(format!("Missing multipart field `{}`", FILE_FIELD))
    })?;

    let service = MediaService::new(state.db.clone(), state.storage.clone());
    let media = service.upload(file_name.as_deref(), &bytes).await?;

    tracing::debug!(user_id = caller.id(), media_id = media.id, "Upload accepted");

    Ok((
        StatusCode::CREATED,
        Json(MediaUploadResponse {
            result: true,
            media_id: media.id,
        }),
    ))
}
