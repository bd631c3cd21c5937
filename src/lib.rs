pub mod auth;
pub mod cache;
pub mod config;
pub mod constants;
pub mod content;
pub mod domain;
pub mod error;
pub mod logging;
pub mod mailer;
pub mod metrics;
pub mod sections;
pub mod seed;
pub mod server;
pub mod storage;
pub mod uploads;
