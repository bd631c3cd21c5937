use super::{flag, JsonBody, PathParam, RecordKey};
use crate::auth::{AdminUser, MaybeAdmin};
use crate::constants::TAG_BLOG;
use crate::content::{aggregate_categories, CategoryCount, Pagination};
use crate::domain::{BlogPost, BlogPostInput, BlogQuery, PostStatus};
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
pub struct BlogParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub featured: Option<String>,
}

/// Public callers only ever see published posts; signed-in users may filter by
/// any status or see all of them.
fn visible_status(admin: &MaybeAdmin, requested: Option<&str>) -> ApiResult<Option<PostStatus>> {
    match (admin.is_admin(), requested.map(str::trim).filter(|s| !s.is_empty())) {
        (false, _) => Ok(Some(PostStatus::Published)),
        (true, Some("all")) | (true, None) => Ok(None),
        (true, Some(status)) => Ok(Some(PostStatus::parse(status)?)),
    }
}

pub(crate) fn find_post(db: &Database, key: &str) -> crate::error::Result<BlogPost> {
    let found = match RecordKey::parse(key) {
        RecordKey::Id(id) => db.get_blog_post(id)?,
        RecordKey::Slug(slug) => db.get_blog_post_by_slug(&slug)?,
    };
    found.ok_or_else(|| CmsError::not_found("Blog post"))
}

pub async fn list_posts(
    State(state): State<AppState>,
    admin: MaybeAdmin,
    Query(params): Query<BlogParams>,
) -> ApiResult<Json<ApiResponse<Vec<BlogPost>>>> {
    let query = BlogQuery {
        status: visible_status(&admin, params.status.as_deref())?,
        featured: params.featured.is_some().then(|| flag(&params.featured)),
        page: Pagination::new(params.limit, params.offset),
        search: params.search,
        category: params.category,
    };
    let (posts, total) = state.db.list_blog_posts(&query)?;
    Ok(paged(posts, total, query.page.limit, query.page.offset))
}

pub async fn categories(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Vec<CategoryCount>>>> {
    let tags = state.db.published_blog_tags()?;
    Ok(ok(aggregate_categories(&tags)))
}

pub async fn get_post(
    State(state): State<AppState>,
    admin: MaybeAdmin,
    PathParam(key): PathParam<String>,
) -> ApiResult<Json<ApiResponse<BlogPost>>> {
    let post = find_post(&state.db, &key)?;
    if !admin.is_admin() && post.status != PostStatus::Published {
        return Err(CmsError::not_found("Blog post").into());
    }
    Ok(ok(post))
}

pub async fn create_post(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    JsonBody(input): JsonBody<BlogPostInput>,
) -> ApiResult<(StatusCode, Json<ApiResponse<BlogPost>>)> {
    let mut post = input.into_post()?;
    if post.author_id.is_none() {
        post.author_id = Some(user.id);
    }
    state.db.create_blog_post(&mut post)?;
    CmsMetrics::record_write("blog", "create");
    state.revalidate(TAG_BLOG);
    let post = state.db.get_blog_post(post.id)?.unwrap_or(post);
    Ok(created(post, "Blog post created"))
}

pub async fn update_post(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(key): PathParam<String>,
    JsonBody(input): JsonBody<BlogPostInput>,
) -> ApiResult<Json<ApiResponse<BlogPost>>> {
    let mut post = find_post(&state.db, &key)?;
    input.apply_to(&mut post)?;
    state.db.update_blog_post(&post)?;
    CmsMetrics::record_write("blog", "update");
    state.revalidate(TAG_BLOG);
    let post = state.db.get_blog_post(post.id)?.unwrap_or(post);
    Ok(ok_with_message(post, "Blog post updated"))
}

pub async fn delete_post(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(key): PathParam<String>,
) -> ApiResult<Json<Value>> {
    let post = find_post(&state.db, &key)?;
    state.db.delete_blog_post(post.id)?;
    CmsMetrics::record_write("blog", "delete");
    state.revalidate(TAG_BLOG);
    Ok(done("Blog post deleted"))
}
