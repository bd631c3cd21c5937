use super::{flag, JsonBody, PathParam};
use crate::auth::{AdminUser, MaybeAdmin};
use crate::constants::{TAG_FOOTER, TAG_NAVBAR};
use crate::domain::{
    build_navbar_tree, FooterLink, FooterLinkInput, FooterSection, FooterSectionInput, NavbarItem,
    NavbarItemInput,
};
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
pub struct NavbarParams {
    pub tree: Option<String>,
    pub all: Option<String>,
}

pub async fn list_navbar(
    State(state): State<AppState>,
    admin: MaybeAdmin,
    Query(params): Query<NavbarParams>,
) -> ApiResult<Json<Value>> {
    let items = state.db.list_navbar_items(admin.is_admin() && flag(&params.all))?;
    let data = if flag(&params.tree) {
        serde_json::to_value(build_navbar_tree(&items)).map_err(CmsError::from)?
    } else {
        serde_json::to_value(items).map_err(CmsError::from)?
    };
    Ok(Json(serde_json::json!({ "success": true, "data": data })))
}

pub async fn create_navbar_item(
    State(state): State<AppState>,
    _user: AdminUser,
    JsonBody(input): JsonBody<NavbarItemInput>,
) -> ApiResult<(StatusCode, Json<ApiResponse<NavbarItem>>)> {
    let mut item = input.into_item()?;
    state.db.create_navbar_item(&mut item)?;
    CmsMetrics::record_write("navbar", "create");
    state.revalidate(TAG_NAVBAR);
    Ok(created(item, "Navbar item created"))
}

pub async fn update_navbar_item(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(id): PathParam<i64>,
    JsonBody(input): JsonBody<NavbarItemInput>,
) -> ApiResult<Json<ApiResponse<NavbarItem>>> {
    let mut item = state
        .db
        .get_navbar_item(id)?
        .ok_or_else(|| CmsError::not_found("Navbar item"))?;
    input.apply_to(&mut item)?;
    state.db.update_navbar_item(&item)?;
    CmsMetrics::record_write("navbar", "update");
    state.revalidate(TAG_NAVBAR);
    Ok(ok_with_message(item, "Navbar item updated"))
}

pub async fn delete_navbar_item(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<Value>> {
    state.db.delete_navbar_item(id)?;
    CmsMetrics::record_write("navbar", "delete");
    state.revalidate(TAG_NAVBAR);
    Ok(done("Navbar item deleted"))
}

#[derive(Debug, Default, Deserialize)]
pub struct FooterParams {
    pub all: Option<String>,
}

pub async fn list_footer(
    State(state): State<AppState>,
    admin: MaybeAdmin,
    Query(params): Query<FooterParams>,
) -> ApiResult<Json<ApiResponse<Vec<FooterSection>>>> {
    Ok(ok(state.db.list_footer_sections(admin.is_admin() && flag(&params.all))?))
}

pub async fn create_footer_section(
    State(state): State<AppState>,
    _user: AdminUser,
    JsonBody(input): JsonBody<FooterSectionInput>,
) -> ApiResult<(StatusCode, Json<ApiResponse<FooterSection>>)> {
    let mut section = input.into_section()?;
    state.db.create_footer_section(&mut section)?;
    CmsMetrics::record_write("footer", "create");
    state.revalidate(TAG_FOOTER);
    Ok(created(section, "Footer section created"))
}

pub async fn update_footer_section(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(id): PathParam<i64>,
    JsonBody(input): JsonBody<FooterSectionInput>,
) -> ApiResult<Json<ApiResponse<FooterSection>>> {
    let mut section = state
        .db
        .get_footer_section(id)?
        .ok_or_else(|| CmsError::not_found("Footer section"))?;
    input.apply_to(&mut section)?;
    state.db.update_footer_section(&section)?;
    CmsMetrics::record_write("footer", "update");
    state.revalidate(TAG_FOOTER);
    Ok(ok_with_message(section, "Footer section updated"))
}

pub async fn delete_footer_section(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<Value>> {
    state.db.delete_footer_section(id)?;
    CmsMetrics::record_write("footer", "delete");
    state.revalidate(TAG_FOOTER);
    Ok(done("Footer section deleted"))
}

pub async fn create_footer_link(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(section_id): PathParam<i64>,
    JsonBody(input): JsonBody<FooterLinkInput>,
) -> ApiResult<(StatusCode, Json<ApiResponse<FooterLink>>)> {
    if state.db.get_footer_section(section_id)?.is_none() {
        return Err(CmsError::not_found("Footer section").into());
    }
    let mut link = input.into_link(section_id)?;
    state.db.create_footer_link(&mut link)?;
    CmsMetrics::record_write("footer", "create");
    state.revalidate(TAG_FOOTER);
    Ok(created(link, "Footer link created"))
}

pub async fn update_footer_link(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(id): PathParam<i64>,
    JsonBody(input): JsonBody<FooterLinkInput>,
) -> ApiResult<Json<ApiResponse<FooterLink>>> {
    let mut link = state
        .db
        .get_footer_link(id)?
        .ok_or_else(|| CmsError::not_found("Footer link"))?;
    input.apply_to(&mut link)?;
    state.db.update_footer_link(&link)?;
    CmsMetrics::record_write("footer", "update");
    state.revalidate(TAG_FOOTER);
    Ok(ok_with_message(link, "Footer link updated"))
}

pub async fn delete_footer_link(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<Value>> {
    state.db.delete_footer_link(id)?;
    CmsMetrics::record_write("footer", "delete");
    state.revalidate(TAG_FOOTER);
    Ok(done("Footer link deleted"))
}
