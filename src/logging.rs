use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes console logging plus a daily-rotated JSON log under `log_dir`.
///
/// The returned guard flushes the file writer when dropped, so `main` holds it
/// for the life of the process.
pub fn init_logging(log_dir: &str) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("agency_cms=info,tower_http=info"));

    if fs::create_dir_all(log_dir).is_err() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stdout))
            .init();
        tracing::warn!(log_dir, "log directory unavailable, logging to console only");
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, "cms.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    // Console layer
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_logging_returns_a_flush_guard() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let guard = init_logging(log_dir.to_str().unwrap());
        assert!(guard.is_some());
        assert!(log_dir.is_dir());
        tracing::info!("logging initialised");
    }
}
