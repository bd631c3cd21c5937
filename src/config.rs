use crate::error::{CmsError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
/// Placeholder secret shipped in the defaults; never used to sign sessions.
pub const DEFAULT_JWT_SECRET: &str = "change-me";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind: String,
    pub database_path: String,
    pub log_dir: String,
    /// Base URL of the public site, used for sitemap/robots links.
    pub public_base_url: String,
    pub upload_dir: PathBuf,
    pub upload_base_url: String,
    pub max_upload_bytes: usize,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub cache_ttl_secs: u64,
    pub revalidate: RevalidateConfig,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RevalidateConfig {
    /// External renderer endpoint notified after each write. Local cache eviction
    /// happens regardless.
    pub url: Option<String>,
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub to: String,
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            database_path: "data/cms.db".to_string(),
            log_dir: "logs".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            upload_dir: PathBuf::from("public/uploads"),
            upload_base_url: "/uploads".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_hours: 24 * 7,
            cache_ttl_secs: 300,
            revalidate: RevalidateConfig::default(),
            smtp: None,
        }
    }
}

impl Config {
    /// Loads `config.toml` when present, then applies environment overrides.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        let path = env::var("CMS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CmsError::Config(format!("Failed to read config file '{}': {}", path, e))
        })?;
        Ok(toml::from_str(&content)?)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = env::var("CMS_BIND") {
            self.bind = v;
        }
        if let Ok(v) = env::var("CMS_DATABASE_PATH") {
            self.database_path = v;
        }
        if let Ok(v) = env::var("CMS_LOG_DIR") {
            self.log_dir = v;
        }
        if let Ok(v) = env::var("CMS_PUBLIC_BASE_URL") {
            self.public_base_url = v;
        }
        if let Ok(v) = env::var("CMS_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("CMS_UPLOAD_BASE_URL") {
            self.upload_base_url = v;
        }
        if let Some(v) = env_parse("CMS_MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = v;
        }
        if let Ok(v) = env::var("CMS_JWT_SECRET") {
            self.jwt_secret = v;
        }
        if let Some(v) = env_parse("CMS_TOKEN_TTL_HOURS") {
            self.token_ttl_hours = v;
        }
        if let Some(v) = env_parse("CMS_CACHE_TTL_SECS") {
            self.cache_ttl_secs = v;
        }
        if let Ok(v) = env::var("CMS_REVALIDATE_URL") {
            self.revalidate.url = Some(v);
        }
        if let Ok(v) = env::var("CMS_REVALIDATE_SECRET") {
            self.revalidate.secret = Some(v);
        }

        if let (Ok(host), Ok(from), Ok(to)) = (
            env::var("SMTP_HOST"),
            env::var("SMTP_FROM"),
            env::var("SMTP_TO"),
        ) {
            self.smtp = Some(SmtpConfig {
                host,
                port: env_parse("SMTP_PORT").unwrap_or_else(default_smtp_port),
                username: env::var("SMTP_USERNAME").ok(),
                password: env::var("SMTP_PASSWORD").ok(),
                from,
                to,
            });
        }
    }

    fn validate(&self) -> Result<()> {
        if self.jwt_secret.trim().is_empty() {
            return Err(CmsError::Config("jwt_secret must not be empty".to_string()));
        }
        if self.token_ttl_hours <= 0 {
            return Err(CmsError::Config("token_ttl_hours must be positive".to_string()));
        }
        Ok(())
    }

    /// Replaces the placeholder JWT secret with a random one for this process.
    /// Sessions then end on restart. Returns whether the secret was replaced.
    pub fn ensure_session_secret(&mut self) -> bool {
        if self.jwt_secret != DEFAULT_JWT_SECRET {
            return false;
        }
        self.jwt_secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        tracing::warn!("CMS_JWT_SECRET is not set; using a random secret, sessions will not survive a restart");
        true
    }

    /// Public base URL without a trailing slash.
    pub fn site_url(&self) -> &str {
        self.public_base_url.trim_end_matches('/')
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            bind = "127.0.0.1:8080"
            [smtp]
            host = "smtp.example.com"
            from = "site@example.com"
            to = "team@example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.upload_base_url, "/uploads");
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.port, 587);
        assert!(smtp.username.is_none());
    }

    #[test]
    fn placeholder_session_secret_is_replaced() {
        let mut config = Config::default();
        assert!(config.ensure_session_secret());
        assert_ne!(config.jwt_secret, DEFAULT_JWT_SECRET);
        assert_eq!(config.jwt_secret.len(), 64);

        let mut other = Config::default();
        other.ensure_session_secret();
        assert_ne!(config.jwt_secret, other.jwt_secret);

        let mut custom = Config {
            jwt_secret: "from-env".to_string(),
            ..Config::default()
        };
        assert!(!custom.ensure_session_secret());
        assert_eq!(custom.jwt_secret, "from-env");
    }

    #[test]
    fn site_url_trims_trailing_slash() {
        let config = Config {
            public_base_url: "https://agency.example/".to_string(),
            ..Config::default()
        };
        assert_eq!(config.site_url(), "https://agency.example");
    }
}
