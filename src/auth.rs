//! Password hashing, session tokens and the request extractors that guard
//! admin routes.
//!
//! Sessions are HS256 JWTs carried in the `admin_token` HttpOnly cookie. The
//! token only names the user; every request reloads the user row so a
//! deactivated or deleted account loses access immediately.

use crate::constants::AUTH_COOKIE;
use crate::domain::{Role, User};
use crate::error::{CmsError, Result};
use crate::metrics::CmsMetrics;
use crate::server::response::ApiError;
use crate::server::AppState;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CmsError::Auth(format!("failed to hash password: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub role: Role,
    pub jti: String,
    pub iat: usize,
    pub exp: usize,
}

pub fn issue_token(user: &User, secret: &str, ttl_hours: i64) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role,
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp() as usize,
        exp: (now + chrono::Duration::hours(ttl_hours)).timestamp() as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| CmsError::Auth(format!("failed to sign token: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| CmsError::Auth(e.to_string()))
}

/// Value of the session cookie, if the request carries one.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == AUTH_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|v| !v.is_empty())
}

pub fn session_cookie(token: &str, ttl_hours: i64) -> String {
    format!(
        "{AUTH_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        ttl_hours * 3600
    )
}

pub fn clear_session_cookie() -> String {
    format!("{AUTH_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}

/// Checks credentials and returns the user plus a fresh token.
pub fn login(state: &AppState, email: &str, password: &str) -> Result<(User, String)> {
    let user = state
        .db
        .get_user_by_email(&email.trim().to_lowercase())?
        .filter(|u| u.is_active)
        .filter(|u| verify_password(password, &u.password_hash))
        .ok_or_else(|| {
            CmsMetrics::record_auth_failure();
            CmsError::Auth("invalid email or password".to_string())
        })?;
    let token = issue_token(&user, &state.config.jwt_secret, state.config.token_ttl_hours)?;
    Ok((user, token))
}

/// Resolves the session cookie to an active user.
pub fn current_user(state: &AppState, headers: &HeaderMap) -> Option<User> {
    let token = token_from_headers(headers)?;
    let claims = match verify_token(&token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Rejected session token: {}", e);
            return None;
        }
    };
    match state.db.get_user(claims.sub) {
        Ok(Some(user)) if user.is_active => Some(user),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Failed to load session user {}: {}", claims.sub, e);
            None
        }
    }
}

/// A signed-in back-office user. Rejects with 401 otherwise.
pub struct AdminUser(pub User);

impl AdminUser {
    /// Limits a route to the `admin` role (user management).
    pub fn require_admin_role(&self) -> std::result::Result<(), ApiError> {
        match self.0.role {
            Role::Admin => Ok(()),
            Role::Editor => Err(ApiError::Forbidden(
                "Only administrators can manage users".to_string(),
            )),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> std::result::Result<Self, Self::Rejection> {
        current_user(state, &parts.headers)
            .map(AdminUser)
            .ok_or(ApiError::Unauthorized)
    }
}

/// The signed-in user when there is one; never rejects. Public reads use it to
/// decide whether drafts are visible.
pub struct MaybeAdmin(pub Option<User>);

impl MaybeAdmin {
    pub fn is_admin(&self) -> bool {
        self.0.is_some()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeAdmin {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> std::result::Result<Self, Self::Rejection> {
        Ok(MaybeAdmin(current_user(state, &parts.headers)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn user() -> User {
        User {
            id: 7,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            role: Role::Admin,
            is_active: true,
            password_hash: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("anything", "not-a-hash"));
    }

    #[test]
    fn tokens_verify_with_the_signing_secret_only() {
        let token = issue_token(&user(), "secret", 1).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.role, Role::Admin);
        assert!(verify_token(&token, "other").is_err());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let token = issue_token(&user(), "secret", -2).unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; admin_token=abc.def; other=1"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc.def"));
        assert!(token_from_headers(&HeaderMap::new()).is_none());
        assert!(session_cookie("t", 1).contains("Max-Age=3600"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
