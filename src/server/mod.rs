//! HTTP surface: JSON API under `/api`, server-rendered public pages, the
//! admin back-office under `/admin`, and static uploads.

use crate::cache::{revalidator_from_config, Revalidator, TagCache};
use crate::config::Config;
use crate::error::Result;
use crate::mailer::{mailer_from_config, Mailer};
use crate::metrics::CmsMetrics;
use crate::storage::Database;
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod admin;
pub mod api;
pub mod response;
pub mod site;
pub mod templates;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub cache: TagCache,
    pub revalidator: Arc<dyn Revalidator>,
    pub mailer: Arc<dyn Mailer>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Result<Self> {
        let mailer = mailer_from_config(config.smtp.as_ref())?;
        Ok(Self::with_mailer(db, config, mailer))
    }

    pub fn with_mailer(db: Database, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            cache: TagCache::new(Duration::from_secs(config.cache_ttl_secs)),
            revalidator: revalidator_from_config(&config.revalidate),
            config: Arc::new(config),
            db,
            mailer,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }

    /// Evicts `tag` locally and notifies the external renderer in the
    /// background. Never fails the caller.
    pub fn revalidate(&self, tag: &str) {
        self.cache.invalidate(tag);
        CmsMetrics::record_revalidation(tag);
        let revalidator = self.revalidator.clone();
        let tag = tag.to_string();
        tokio::spawn(async move {
            if let Err(e) = revalidator.revalidate(&tag).await {
                CmsMetrics::record_revalidation_failure();
                warn!("Revalidation of '{}' failed: {}", tag, e);
            }
        });
    }
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "agency-cms",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

/// Create the HTTP server with all routes
pub fn create_server(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let uploads = ServeDir::new(&state.config.upload_dir);
    let upload_mount = state.config.upload_base_url.trim_end_matches('/').to_string();
    let upload_mount = if upload_mount.is_empty() { "/uploads".to_string() } else { upload_mount };

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api::routes(state.config.max_upload_bytes))
        .nest("/admin", admin::routes())
        .merge(site::routes())
        .nest_service(&upload_mount, uploads)
        .fallback(site::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let bind = state.config.bind.clone();
    let app = create_server(state);
    let listener = tokio::net::TcpListener::bind(&bind).await?;

    info!("CMS listening on http://{}", bind);
    info!("Admin back-office at http://{}/admin", bind);

    axum::serve(listener, app).await?;
    Ok(())
}
