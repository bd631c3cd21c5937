//! Counters for the CMS and the Prometheus recorder that renders them at
//! `/metrics`.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

pub const REVALIDATIONS: &str = "cms_revalidations_total";
pub const REVALIDATION_FAILURES: &str = "cms_revalidation_failures_total";
pub const CONTACT_SUBMISSIONS: &str = "cms_contact_submissions_total";
pub const UPLOADS: &str = "cms_uploads_total";
pub const AUTH_FAILURES: &str = "cms_auth_failures_total";
pub const CONTENT_WRITES: &str = "cms_content_writes_total";

/// Installs the global recorder. Returns `None` when one is already installed
/// (tests build many routers in one process).
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Prometheus recorder installed, exposed at /metrics");
            Some(handle)
        }
        Err(e) => {
            warn!("Prometheus recorder install failed (possibly already installed): {}", e);
            None
        }
    }
}

pub struct CmsMetrics;

impl CmsMetrics {
    pub fn record_revalidation(tag: &str) {
        ::metrics::counter!(REVALIDATIONS, "tag" => tag.to_string()).increment(1);
    }

    pub fn record_revalidation_failure() {
        ::metrics::counter!(REVALIDATION_FAILURES).increment(1);
    }

    pub fn record_contact_submission() {
        ::metrics::counter!(CONTACT_SUBMISSIONS).increment(1);
    }

    pub fn record_upload(kind: &'static str, bytes: usize) {
        ::metrics::counter!(UPLOADS, "kind" => kind).increment(1);
        ::metrics::histogram!("cms_upload_bytes").record(bytes as f64);
    }

    pub fn record_auth_failure() {
        ::metrics::counter!(AUTH_FAILURES).increment(1);
    }

    /// One create/update/delete against `resource`.
    pub fn record_write(resource: &str, op: &'static str) {
        ::metrics::counter!(CONTENT_WRITES, "resource" => resource.to_string(), "op" => op).increment(1);
    }
}
