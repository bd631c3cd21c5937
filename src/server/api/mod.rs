//! JSON API. Every write requires a signed-in back-office user except the
//! public contact form and login.

use super::response::{done, ApiError, ApiResult};
use super::AppState;
use crate::auth::AdminUser;
use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequest, FromRequestParts, Path, Request, State},
    http::request::Parts,
    routing::{get, post, put},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize};

pub mod auth;
pub mod blog;
pub mod contact;
pub mod navigation;
pub mod pages;
pub mod services;
pub mod settings;
pub mod testimonials;
pub mod upload;
pub mod users;

/// Multipart framing overhead allowed on top of the configured file size, so
/// an oversized file reaches the handler and gets a 400 instead of a 413.
const UPLOAD_FRAMING_SLACK: usize = 1024 * 1024;

pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/blog", get(blog::list_posts).post(blog::create_post))
        .route("/blog/categories", get(blog::categories))
        .route(
            "/blog/:key",
            get(blog::get_post).put(blog::update_post).delete(blog::delete_post),
        )
        .route(
            "/services/categories",
            get(services::list_categories).post(services::create_category),
        )
        .route(
            "/services/categories/:id",
            get(services::get_category)
                .put(services::update_category)
                .delete(services::delete_category),
        )
        .route(
            "/services/subcategories",
            get(services::list_subcategories).post(services::create_subcategory),
        )
        .route(
            "/services/subcategories/:id",
            put(services::update_subcategory).delete(services::delete_subcategory),
        )
        .route("/services", get(services::list_posts).post(services::create_post))
        .route(
            "/services/:key",
            get(services::get_post)
                .put(services::update_post)
                .delete(services::delete_post),
        )
        .route("/navbar", get(navigation::list_navbar).post(navigation::create_navbar_item))
        .route(
            "/navbar/:id",
            put(navigation::update_navbar_item).delete(navigation::delete_navbar_item),
        )
        .route(
            "/footer-sections",
            get(navigation::list_footer).post(navigation::create_footer_section),
        )
        .route(
            "/footer-sections/:id",
            put(navigation::update_footer_section).delete(navigation::delete_footer_section),
        )
        .route("/footer-sections/:id/links", post(navigation::create_footer_link))
        .route(
            "/footer-links/:id",
            put(navigation::update_footer_link).delete(navigation::delete_footer_link),
        )
        .route("/store-settings", get(settings::get_settings).put(settings::update_settings))
        .route(
            "/testimonial",
            get(testimonials::list_testimonials).post(testimonials::create_testimonial),
        )
        .route(
            "/testimonial/:id",
            get(testimonials::get_testimonial)
                .put(testimonials::update_testimonial)
                .delete(testimonials::delete_testimonial),
        )
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/contact", get(contact::list_submissions).post(contact::submit))
        .route(
            "/contact/:id",
            put(contact::mark_read).delete(contact::delete_submission),
        )
        .route(
            "/upload",
            post(upload::upload)
                .layer(DefaultBodyLimit::max(max_upload_bytes.saturating_add(UPLOAD_FRAMING_SLACK))),
        )
        .route(
            "/pages/:page/:section",
            get(pages::get_section)
                .post(pages::create_item)
                .put(pages::upsert_singleton),
        )
        .route(
            "/pages/:page/:section/:id",
            get(pages::get_item).put(pages::update_item).delete(pages::delete_item),
        )
        .route("/revalidate", post(revalidate))
}

/// `Json` whose rejection uses the API error envelope.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(JsonBody(value))
    }
}

/// `Path` whose rejection uses the API error envelope.
pub struct PathParam<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(PathParam(value))
    }
}

/// A path segment that is either a numeric id or a slug.
pub enum RecordKey {
    Id(i64),
    Slug(String),
}

impl RecordKey {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(id) => RecordKey::Id(id),
            Err(_) => RecordKey::Slug(raw.trim().to_string()),
        }
    }
}

/// `true`, `1`, `yes` and `on` count as set.
pub fn flag(value: &Option<String>) -> bool {
    matches!(
        value.as_deref().map(|v| v.trim().to_lowercase()).as_deref(),
        Some("true" | "1" | "yes" | "on")
    )
}

#[derive(Debug, Deserialize)]
pub struct RevalidateRequest {
    pub tag: String,
}

/// Manual cache invalidation.
pub async fn revalidate(
    State(state): State<AppState>,
    _user: AdminUser,
    JsonBody(body): JsonBody<RevalidateRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let tag = body.tag.trim();
    if tag.is_empty() {
        return Err(ApiError::BadRequest("tag is required".to_string()));
    }
    state.revalidate(tag);
    Ok(done(format!("Revalidated '{tag}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keys_and_flags() {
        assert!(matches!(RecordKey::parse("42"), RecordKey::Id(42)));
        assert!(matches!(RecordKey::parse("hello-world"), RecordKey::Slug(ref s) if s == "hello-world"));
        assert!(flag(&Some("TRUE".into())));
        assert!(!flag(&Some("no".into())));
        assert!(!flag(&None));
    }
}
