use super::JsonBody;
use crate::auth::{self, clear_session_cookie, session_cookie, AdminUser};
use crate::domain::User;
use crate::server::response::{done, ok, ok_with_message, ApiResponse, ApiResult};
use crate::server::AppState;
use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (user, token) = auth::login(&state, &body.email, &body.password)?;
    info!("{} signed in", user.email);
    let cookie = session_cookie(&token, state.config.token_ttl_hours);
    Ok((
        [(header::SET_COOKIE, cookie)],
        ok_with_message(user, "Signed in"),
    ))
}

pub async fn logout() -> impl IntoResponse {
    ([(header::SET_COOKIE, clear_session_cookie())], done("Signed out"))
}

pub async fn me(AdminUser(user): AdminUser) -> ApiResult<Json<ApiResponse<User>>> {
    Ok(ok(user))
}
