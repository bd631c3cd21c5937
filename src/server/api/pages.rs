//! Generic endpoints for registry-defined page sections.

use super::{flag, JsonBody, PathParam};
use crate::auth::{AdminUser, MaybeAdmin};
use crate::error::CmsError;
use crate::metrics::CmsMetrics;
use crate::sections::{self, SectionDef};
use crate::server::response::{created, done, ok, ok_with_message, ApiError, ApiResponse, ApiResult};
use crate::server::AppState;
use crate::storage::SectionDocument;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

fn section(page: &str, name: &str) -> ApiResult<&'static SectionDef> {
    sections::lookup(page, name).ok_or_else(|| ApiError::NotFound("Section".to_string()))
}

fn find_item(state: &AppState, def: &SectionDef, id: i64) -> ApiResult<SectionDocument> {
    Ok(state
        .db
        .get_document(&def.collection(), id)?
        .ok_or_else(|| CmsError::not_found("Section item"))?)
}

fn after_write(state: &AppState, def: &SectionDef, op: &'static str) {
    CmsMetrics::record_write(&def.collection(), op);
    state.revalidate(&def.tag());
}

#[derive(Debug, Default, Deserialize)]
pub struct SectionParams {
    pub all: Option<String>,
}

/// Singletons answer with the active document (`{}` when none); collections
/// with their ordered items.
pub async fn get_section(
    State(state): State<AppState>,
    admin: MaybeAdmin,
    PathParam((page, name)): PathParam<(String, String)>,
    Query(params): Query<SectionParams>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    let def = section(&page, &name)?;
    let data = if def.is_singleton() {
        match state.db.active_document(&def.collection())? {
            Some(doc) => serde_json::to_value(doc).map_err(CmsError::from)?,
            None => json!({}),
        }
    } else {
        let include_inactive = admin.is_admin() && flag(&params.all);
        serde_json::to_value(state.db.list_documents(&def.collection(), include_inactive)?)
            .map_err(CmsError::from)?
    };
    Ok(ok(data))
}

pub async fn create_item(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam((page, name)): PathParam<(String, String)>,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<(StatusCode, Json<ApiResponse<SectionDocument>>)> {
    let def = section(&page, &name)?;
    let payload = def.normalize(&body, false)?;
    let (is_active, display_order) = (payload.is_active, payload.display_order);
    let mut doc = SectionDocument::new(&def.collection(), payload.into_data());
    doc.is_active = is_active.unwrap_or(true);
    doc.display_order = display_order.unwrap_or(0);
    state.db.insert_document(&mut doc, def.is_singleton())?;
    after_write(&state, def, "create");
    Ok(created(doc, format!("{} saved", def.title())))
}

/// Creates the singleton's document or merges the body into the active one.
pub async fn upsert_singleton(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam((page, name)): PathParam<(String, String)>,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Json<ApiResponse<SectionDocument>>> {
    let def = section(&page, &name)?;
    if !def.is_singleton() {
        return Err(ApiError::BadRequest(format!(
            "{} is a list; update items by id",
            def.title()
        )));
    }

    let doc = match state.db.active_document(&def.collection())? {
        Some(mut doc) => {
            let payload = def.normalize(&body, true)?;
            apply_meta(&mut doc, payload.is_active, payload.display_order);
            payload.merge_into(&mut doc.data);
            check_required(def, &doc)?;
            doc.updated_at = Utc::now();
            state.db.update_document(&doc, true)?;
            doc
        }
        None => {
            let payload = def.normalize(&body, false)?;
            let (is_active, display_order) = (payload.is_active, payload.display_order);
            let mut doc = SectionDocument::new(&def.collection(), payload.into_data());
            apply_meta(&mut doc, is_active, display_order);
            state.db.insert_document(&mut doc, true)?;
            doc
        }
    };
    after_write(&state, def, "update");
    Ok(ok_with_message(doc, format!("{} saved", def.title())))
}

/// Inactive items are only visible to signed-in users.
pub async fn get_item(
    State(state): State<AppState>,
    admin: MaybeAdmin,
    PathParam((page, name, id)): PathParam<(String, String, i64)>,
) -> ApiResult<Json<ApiResponse<SectionDocument>>> {
    let def = section(&page, &name)?;
    let doc = find_item(&state, def, id)?;
    if !doc.is_active && !admin.is_admin() {
        return Err(CmsError::not_found("Section item").into());
    }
    Ok(ok(doc))
}

/// Partial update of one item: omitted fields keep their value, `null` or an
/// empty string clears an optional field.
pub async fn update_item(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam((page, name, id)): PathParam<(String, String, i64)>,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Json<ApiResponse<SectionDocument>>> {
    let def = section(&page, &name)?;
    let mut doc = find_item(&state, def, id)?;
    let payload = def.normalize(&body, true)?;
    apply_meta(&mut doc, payload.is_active, payload.display_order);
    payload.merge_into(&mut doc.data);
    check_required(def, &doc)?;
    doc.updated_at = Utc::now();
    state.db.update_document(&doc, def.is_singleton())?;
    after_write(&state, def, "update");
    Ok(ok_with_message(doc, format!("{} updated", def.title())))
}

pub async fn delete_item(
    State(state): State<AppState>,
    _user: AdminUser,
    PathParam((page, name, id)): PathParam<(String, String, i64)>,
) -> ApiResult<Json<Value>> {
    let def = section(&page, &name)?;
    state.db.delete_document(&def.collection(), id)?;
    after_write(&state, def, "delete");
    Ok(done(format!("{} item deleted", def.title())))
}

fn apply_meta(doc: &mut SectionDocument, is_active: Option<bool>, display_order: Option<i64>) {
    if let Some(active) = is_active {
        doc.is_active = active;
    }
    if let Some(order) = display_order {
        doc.display_order = order;
    }
}

/// Stored documents that predate a field becoming required are caught here.
fn check_required(def: &SectionDef, doc: &SectionDocument) -> crate::error::Result<()> {
    match def.fields.iter().find(|f| f.required && !doc.has(f.name)) {
        Some(field) => Err(CmsError::validation(format!("{} is required", field.name))),
        None => Ok(()),
    }
}
