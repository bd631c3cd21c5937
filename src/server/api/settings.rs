use super::JsonBody;
use crate::auth::AdminUser;
use crate::constants::TAG_STORE_SETTINGS;
use crate::domain::StoreSettings;
use crate::metrics::CmsMetrics;
use crate::server::response::{ok, ok_with_message, ApiResponse, ApiResult};
use crate::server::AppState;
use axum::{extract::State, Json};

/// Current settings; an empty object until the first save.
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<StoreSettings>>> {
    Ok(ok(state.db.get_store_settings()?.unwrap_or_default()))
}

/// Partial update. Omitted fields keep their stored value.
pub async fn update_settings(
    State(state): State<AppState>,
    _user: AdminUser,
    JsonBody(patch): JsonBody<StoreSettings>,
) -> ApiResult<Json<ApiResponse<StoreSettings>>> {
    let settings = state.db.upsert_store_settings(patch)?;
    CmsMetrics::record_write("store-settings", "update");
    state.revalidate(TAG_STORE_SETTINGS);
    Ok(ok_with_message(settings, "Settings saved"))
}
