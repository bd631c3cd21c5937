use crate::error::CmsError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Cms(#[from] CmsError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Cms(err) => match err {
                CmsError::Validation(_) => StatusCode::BAD_REQUEST,
                CmsError::NotFound(_) => StatusCode::NOT_FOUND,
                CmsError::Conflict(_) => StatusCode::CONFLICT,
                CmsError::Auth(_) => StatusCode::UNAUTHORIZED,
                e if e.is_unique_violation() => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// `{ "success": true, "data": ... }` with an optional message and extra
/// top-level fields (pagination totals).
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub meta: Option<Value>,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
        message: None,
        meta: None,
    })
}

pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
        message: Some(message.into()),
        meta: None,
    })
}

/// 201 with the created record.
pub fn created<T: Serialize>(data: T, message: impl Into<String>) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok_with_message(data, message))
}

/// A page of rows plus `total`, `limit` and `offset`.
pub fn paged<T: Serialize>(data: T, total: usize, limit: usize, offset: usize) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
        message: None,
        meta: Some(json!({ "total": total, "limit": limit, "offset": offset })),
    })
}

/// Success with no payload other than a message.
pub fn done(message: impl Into<String>) -> Json<Value> {
    Json(json!({ "success": true, "message": message.into() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_statuses() {
        assert_eq!(ApiError::from(CmsError::validation("x")).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(CmsError::not_found("Post")).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(CmsError::Conflict("dup".into())).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(CmsError::Poisoned).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn paged_response_flattens_totals() {
        let Json(body) = paged(vec![1, 2], 10, 2, 4);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["total"], 10);
        assert_eq!(json["limit"], 2);
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert!(json.get("message").is_none());
    }
}
