use super::{flag, JsonBody, PathParam, RecordKey};
use crate::auth::{AdminUser, MaybeAdmin};
use crate::constants::TAG_SERVICES;
use crate::content::Pagination;
use crate::domain::{
    PostStatus, ServiceCategory, ServiceCategoryInput, ServicePost, ServicePostInput, ServiceQuery,
    ServiceSubcategory, ServiceSubcategoryInput,
};
use crate::error::CmsError;
use crate::metrics::CmsMetrics;
use crate::server::response::{created, done, ok, ok_with_message, paged, ApiResponse, ApiResult};
use crate::server::AppState;
use crate::storage::Database;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
pub struct ServiceParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryParams {
    pub all: Option<String>,
    pub category_id: Option<i64>,
}

pub(crate) fn find_service(db: &Database, key: &str) -> crate::error::Result<ServicePost> {
    let found = match RecordKey::parse(key) {
        RecordKey::Id(id) => db.get_service_post(id)?,
        RecordKey::Slug(slug) => db.get_service_post_by_slug(&slug)?,
    };
    found.ok_or_else(|| CmsError::not_found("Service"))
}

pub async fn list_posts(
    State(state): State<AppState>,
    admin: MaybeAdmin,
    Query(params): Query<ServiceParams>,
) -> ApiResult<Json<ApiResponse<Vec<ServicePost>>>> {
    let status = match (admin.is_admin(), params.status.as_deref().map(str::trim)) {
        (false, _) => Some(PostStatus::Published),
        (true, None | Some("") | Some("all")) => None,
        (true, Some(s)) => Some(PostStatus::parse(s)?),
    };
    let query = ServiceQuery {
        status,
        page: Pagination::new(params.limit, params.offset),
        search: params.search,
        category: params.category,
        subcategory: params.subcategory,
    };
    let (posts, total) = state.db.list_service_posts(&query)?;
    Ok(paged(posts, total, query.page.limit, query.page.offset))
}

pub async fn get_post(
    State(state): State<AppState>,
    admin: MaybeAdmin,
    PathParam(key): PathParam<String>,
) -> ApiResult<Json<ApiResponse<ServicePost>>> {
    let post = find_service(&state.db, &key)?;
    if !admin.is_admin() && post.status != PostStatus::Published {
        return Err(CmsError::not_found("Service").into());
    }
    Ok(ok(post))
}

pub async fn create_post(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    JsonBody(input): JsonBody<ServicePostInput>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ServicePost>>)> {
    let mut post = input.into_post()?;
    if post.author_id.is_none() {
        post.author_id = Some(user.id);
    }
    state.db.create_service_post(&mut post)?;
    CmsMetrics::record_write("services", "create");
    state.revalidate(TAG_SERVICES);
    let post = state.db.get_service_post(post.id)?.unwrap_or(post);
    Ok(created(post, "Service created"))
}

pub async fn update_post(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(key): PathParam<String>,
    JsonBody(input): JsonBody<ServicePostInput>,
) -> ApiResult<Json<ApiResponse<ServicePost>>> {
    let mut post = find_service(&state.db, &key)?;
    input.apply_to(&mut post)?;
    state.db.update_service_post(&post)?;
    CmsMetrics::record_write("services", "update");
    state.revalidate(TAG_SERVICES);
    let post = state.db.get_service_post(post.id)?.unwrap_or(post);
    Ok(ok_with_message(post, "Service updated"))
}

pub async fn delete_post(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(key): PathParam<String>,
) -> ApiResult<Json<Value>> {
    let post = find_service(&state.db, &key)?;
    state.db.delete_service_post(post.id)?;
    CmsMetrics::record_write("services", "delete");
    state.revalidate(TAG_SERVICES);
    Ok(done("Service deleted"))
}

// Categories

pub async fn list_categories(
    State(state): State<AppState>,
    admin: MaybeAdmin,
    Query(params): Query<CategoryParams>,
) -> ApiResult<Json<ApiResponse<Vec<ServiceCategory>>>> {
    let include_inactive = admin.is_admin() && flag(&params.all);
    Ok(ok(state.db.list_service_categories(include_inactive)?))
}

pub async fn get_category(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<ApiResponse<ServiceCategory>>> {
    let category = state
        .db
        .get_service_category(id)?
        .ok_or_else(|| CmsError::not_found("Service category"))?;
    Ok(ok(category))
}

pub async fn create_category(
    State(state): State<AppState>,
    _user: AdminUser,
    JsonBody(input): JsonBody<ServiceCategoryInput>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ServiceCategory>>)> {
    let mut category = input.into_category()?;
    state.db.create_service_category(&mut category)?;
    CmsMetrics::record_write("service-categories", "create");
    state.revalidate(TAG_SERVICES);
    Ok(created(category, "Service category created"))
}

pub async fn update_category(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(id): PathParam<i64>,
    JsonBody(input): JsonBody<ServiceCategoryInput>,
) -> ApiResult<Json<ApiResponse<ServiceCategory>>> {
    let mut category = state
        .db
        .get_service_category(id)?
        .ok_or_else(|| CmsError::not_found("Service category"))?;
    input.apply_to(&mut category)?;
    state.db.update_service_category(&category)?;
    CmsMetrics::record_write("service-categories", "update");
    state.revalidate(TAG_SERVICES);
    Ok(ok_with_message(category, "Service category updated"))
}

pub async fn delete_category(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<Value>> {
    state.db.delete_service_category(id)?;
    CmsMetrics::record_write("service-categories", "delete");
    state.revalidate(TAG_SERVICES);
    Ok(done("Service category deleted"))
}

// Subcategories

pub async fn list_subcategories(
    State(state): State<AppState>,
    Query(params): Query<CategoryParams>,
) -> ApiResult<Json<ApiResponse<Vec<ServiceSubcategory>>>> {
    Ok(ok(state.db.list_service_subcategories(params.category_id)?))
}

pub async fn create_subcategory(
    State(state): State<AppState>,
    _user: AdminUser,
    JsonBody(input): JsonBody<ServiceSubcategoryInput>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ServiceSubcategory>>)> {
    let mut sub = input.into_subcategory()?;
    state.db.create_service_subcategory(&mut sub)?;
    CmsMetrics::record_write("service-subcategories", "create");
    state.revalidate(TAG_SERVICES);
    Ok(created(sub, "Service subcategory created"))
}

pub async fn update_subcategory(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(id): PathParam<i64>,
    JsonBody(input): JsonBody<ServiceSubcategoryInput>,
) -> ApiResult<Json<ApiResponse<ServiceSubcategory>>> {
    let mut sub = state
        .db
        .get_service_subcategory(id)?
        .ok_or_else(|| CmsError::not_found("Service subcategory"))?;
    input.apply_to(&mut sub)?;
    state.db.update_service_subcategory(&sub)?;
    CmsMetrics::record_write("service-subcategories", "update");
    state.revalidate(TAG_SERVICES);
    Ok(ok_with_message(sub, "Service subcategory updated"))
}

pub async fn delete_subcategory(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<Value>> {
    state.db.delete_service_subcategory(id)?;
    CmsMetrics::record_write("service-subcategories", "delete");
    state.revalidate(TAG_SERVICES);
    Ok(done("Service subcategory deleted"))
}
