use super::{flag, JsonBody, PathParam, RecordKey};
use crate::auth::{AdminUser, MaybeAdmin};
use crate::constants::TAG_TESTIMONIALS;
use crate::domain::{Testimonial, TestimonialInput};
use crate::error::CmsError;
use crate::metrics::CmsMetrics;
use crate::server::response::{created, done, ok, ok_with_message, ApiResponse, ApiResult};
use crate::server::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
pub struct TestimonialParams {
    /// Service id or slug.
    pub service: Option<String>,
    pub all: Option<String>,
}

pub async fn list_testimonials(
    State(state): State<AppState>,
    admin: MaybeAdmin,
    Query(params): Query<TestimonialParams>,
) -> ApiResult<Json<ApiResponse<Vec<Testimonial>>>> {
    let service_id = match params.service.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => None,
        Some(raw) => match RecordKey::parse(raw) {
            RecordKey::Id(id) => Some(id),
            // An unknown slug simply matches nothing.
            RecordKey::Slug(slug) => match state.db.get_service_post_by_slug(&slug)? {
                Some(post) => Some(post.id),
                None => return Ok(ok(Vec::new())),
            },
        },
    };
    let include_inactive = admin.is_admin() && flag(&params.all);
    Ok(ok(state.db.list_testimonials(service_id, include_inactive)?))
}

pub async fn get_testimonial(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<ApiResponse<Testimonial>>> {
    let testimonial = state
        .db
        .get_testimonial(id)?
        .ok_or_else(|| CmsError::not_found("Testimonial"))?;
    Ok(ok(testimonial))
}

pub async fn create_testimonial(
    State(state): State<AppState>,
    _user: AdminUser,
    JsonBody(input): JsonBody<TestimonialInput>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Testimonial>>)> {
    let mut testimonial = input.into_testimonial()?;
    state.db.create_testimonial(&mut testimonial)?;
    CmsMetrics::record_write("testimonials", "create");
    state.revalidate(TAG_TESTIMONIALS);
    Ok(created(testimonial, "Testimonial created"))
}

pub async fn update_testimonial(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(id): PathParam<i64>,
    JsonBody(input): JsonBody<TestimonialInput>,
) -> ApiResult<Json<ApiResponse<Testimonial>>> {
    let mut testimonial = state
        .db
        .get_testimonial(id)?
        .ok_or_else(|| CmsError::not_found("Testimonial"))?;
    input.apply_to(&mut testimonial)?;
    state.db.update_testimonial(&testimonial)?;
    CmsMetrics::record_write("testimonials", "update");
    state.revalidate(TAG_TESTIMONIALS);
    Ok(ok_with_message(testimonial, "Testimonial updated"))
}

pub async fn delete_testimonial(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<Value>> {
    state.db.delete_testimonial(id)?;
    CmsMetrics::record_write("testimonials", "delete");
    state.revalidate(TAG_TESTIMONIALS);
    Ok(done("Testimonial deleted"))
}
