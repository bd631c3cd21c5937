use super::{flag, JsonBody, PathParam};
use crate::auth::AdminUser;
use crate::domain::{ContactInput, ContactSubmission};
use crate::error::CmsError;
use crate::metrics::CmsMetrics;
use crate::server::response::{created, done, ok, ok_with_message, ApiError, ApiResponse, ApiResult};
use crate::server::AppState;
use axum::{
    async_trait,
    extract::{FromRequest, Query, Request, State},
    http::{header, StatusCode},
    Form, Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

/// Contact form body, accepted as JSON or as `application/x-www-form-urlencoded`.
pub struct ContactBody(pub ContactInput);

#[async_trait]
impl<S> FromRequest<S> for ContactBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        if is_form {
            let Form(input) = Form::<ContactInput>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Ok(ContactBody(input))
        } else {
            let JsonBody(input) = JsonBody::<ContactInput>::from_request(req, state).await?;
            Ok(ContactBody(input))
        }
    }
}

/// Stores a submission and e-mails the staff inbox in the background.
pub(crate) fn record_submission(state: &AppState, input: ContactInput) -> crate::error::Result<ContactSubmission> {
    let mut submission = input.into_submission()?;
    state.db.create_contact_submission(&mut submission)?;
    CmsMetrics::record_contact_submission();
    info!("Contact submission {} from {}", submission.id, submission.email);

    let mailer = state.mailer.clone();
    let subject = submission.notification_subject();
    let body = submission.notification_body();
    tokio::spawn(async move {
        if let Err(e) = mailer.notify(&subject, &body).await {
            warn!("Contact notification failed: {}", e);
        }
    });
    Ok(submission)
}

pub async fn submit(
    State(state): State<AppState>,
    ContactBody(input): ContactBody,
) -> ApiResult<(StatusCode, Json<ApiResponse<ContactSubmission>>)> {
    let submission = record_submission(&state, input)?;
    Ok(created(submission, "Thank you, we will be in touch shortly"))
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactParams {
    pub unread: Option<String>,
}

pub async fn list_submissions(
    State(state): State<AppState>,
    _user: AdminUser,
    Query(params): Query<ContactParams>,
) -> ApiResult<Json<ApiResponse<Vec<ContactSubmission>>>> {
    Ok(ok(state.db.list_contact_submissions(flag(&params.unread))?))
}

#[derive(Debug, Default, Deserialize)]
pub struct MarkReadRequest {
    pub is_read: Option<bool>,
}

/// Marks read, or unread with `{ "is_read": false }`. An empty body counts as read.
pub async fn mark_read(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(id): PathParam<i64>,
    body: Option<Json<MarkReadRequest>>,
) -> ApiResult<Json<ApiResponse<ContactSubmission>>> {
    let is_read = body.and_then(|Json(b)| b.is_read).unwrap_or(true);
    state.db.set_contact_read(id, is_read)?;
    let submission = state
        .db
        .get_contact_submission(id)?
        .ok_or_else(|| CmsError::not_found("Contact submission"))?;
    Ok(ok_with_message(submission, "Submission updated"))
}

pub async fn delete_submission(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<Value>> {
    state.db.delete_contact_submission(id)?;
    CmsMetrics::record_write("contact", "delete");
    Ok(done("Submission deleted"))
}
