use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;

use lex_core::enums::Role;
use lex_storage::StoredObject;

use crate::error::{ApiError, ApiResult};
use crate::extract::AuthUser;
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new().route("/uploads", post(upload))
}

/// The `file` part of a multipart body plus an optional `folder` field.
pub struct MultipartUpload {
    pub folder: Option<String>,
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

pub async fn read_upload(mut multipart: Multipart) -> ApiResult<MultipartUpload> {
    let mut folder = None;
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let name = field.name().map(ToString::to_string);
        match name.as_deref() {
            Some("folder") => {
                folder = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.body_text()))?
                        .trim()
                        .to_string(),
                );
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                file = Some((file_name, content_type, data));
            }
            _ => {}
        }
    }
    let (file_name, content_type, data) =
        file.ok_or_else(|| ApiError::bad_request("multipart field 'file' is required"))?;
    Ok(MultipartUpload {
        folder,
        file_name,
        content_type,
        data,
    })
}

async fn upload(
    State(state): State<SharedState>,
    user: AuthUser,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<StoredObject>)> {
    user.require(&[Role::Teacher, Role::Admin])?;
    let upload = read_upload(multipart).await?;
    let folder = upload
        .folder
        .ok_or_else(|| ApiError::bad_request("multipart field 'folder' is required"))?;
    let stored = state
        .uploads
        .upload(&folder, &upload.file_name, &upload.content_type, upload.data)
        .await?;
    Ok((StatusCode::CREATED, Json(stored)))
}
