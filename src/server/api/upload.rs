use crate::auth::AdminUser;
use crate::metrics::CmsMetrics;
use crate::server::response::{created, ApiError, ApiResponse, ApiResult};
use crate::server::AppState;
use crate::uploads::{save_upload, UploadTarget, UploadedFile};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};

/// Multipart upload: a `file` part and an optional `kind` part (`favicon`).
pub async fn upload(
    State(state): State<AppState>,
    _user: AdminUser,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ApiResponse<UploadedFile>>)> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut favicon = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        match field.name() {
            Some("file") => {
                let name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                file = Some((name, bytes.to_vec()));
            }
            Some("kind") => {
                let kind = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                favicon = kind.trim().eq_ignore_ascii_case("favicon");
            }
            _ => {}
        }
    }

    let (name, bytes) = file.ok_or_else(|| ApiError::BadRequest("file is required".to_string()))?;
    let target = UploadTarget {
        dir: &state.config.upload_dir,
        base_url: &state.config.upload_base_url,
        max_bytes: state.config.max_upload_bytes,
    };
    let saved = save_upload(&target, &name, &bytes, favicon)?;
    CmsMetrics::record_upload(if favicon { "favicon" } else { "file" }, saved.size);
    Ok(created(saved, "File uploaded"))
}
