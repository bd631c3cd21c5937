use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("Template rendering failed: {0}")]
    Template(#[from] askama::Error),

    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Storage lock poisoned")]
    Poisoned,
}

impl CmsError {
    pub fn validation(message: impl Into<String>) -> Self {
        CmsError::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        CmsError::NotFound(what.into())
    }

    /// True when SQLite rejected a write because of a UNIQUE or PRIMARY KEY constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            CmsError::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.extended_code,
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            ),
            CmsError::Conflict(_) => true,
            _ => false,
        }
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(
            self,
            CmsError::Database(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
        )
    }
}

pub type Result<T> = std::result::Result<T, CmsError>;
