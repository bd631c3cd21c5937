use super::{merge, merge_required, optional, required};
use crate::error::{CmsError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
}

impl Role {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            other => Err(CmsError::validation(format!("Invalid role '{other}'"))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'))
        .unwrap_or(false);
    if !valid {
        return Err(CmsError::validation("email is not a valid address"));
    }
    Ok(email)
}

fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CmsError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

impl UserInput {
    /// Validated new user. The returned password is plain text; callers hash it
    /// before the record reaches storage.
    pub fn into_user(self) -> Result<(User, String)> {
        let name = required(&self.name, "name")?;
        let email = normalize_email(&required(&self.email, "email")?)?;
        let password = self
            .password
            .ok_or_else(|| CmsError::validation("password is required"))?;
        check_password(&password)?;
        let role = match optional(self.role) {
            Some(r) => Role::parse(&r)?,
            None => Role::Editor,
        };
        let now = Utc::now();
        Ok((
            User {
                id: 0,
                name,
                email,
                role,
                is_active: self.is_active.unwrap_or(true),
                password_hash: String::new(),
                created_at: now,
                updated_at: now,
            },
            password,
        ))
    }

    /// Merges the provided fields; returns the new plain-text password, if any.
    pub fn apply_to(self, user: &mut User) -> Result<Option<String>> {
        merge_required(&mut user.name, &self.name, "name")?;
        if self.email.is_some() {
            user.email = normalize_email(&required(&self.email, "email")?)?;
        }
        if let Some(role) = optional(self.role) {
            user.role = Role::parse(&role)?;
        }
        merge(&mut user.is_active, self.is_active);
        user.updated_at = Utc::now();

        match self.password {
            Some(p) if !p.is_empty() => {
                check_password(&p)?;
                Ok(Some(p))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_defaults_to_editor() {
        let (user, password) = UserInput {
            name: Some("Ada".into()),
            email: Some(" Ada@Example.com ".into()),
            password: Some("correct horse".into()),
            ..Default::default()
        }
        .into_user()
        .unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.role, Role::Editor);
        assert_eq!(password, "correct horse");
    }

    #[test]
    fn rejects_short_password_and_bad_email() {
        let short = UserInput {
            name: Some("Ada".into()),
            email: Some("ada@example.com".into()),
            password: Some("short".into()),
            ..Default::default()
        };
        assert!(short.into_user().is_err());
        assert!(normalize_email("not-an-email").is_err());
        assert!(normalize_email("a@localhost").is_err());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let (mut user, _) = UserInput {
            name: Some("Ada".into()),
            email: Some("ada@example.com".into()),
            password: Some("long enough".into()),
            ..Default::default()
        }
        .into_user()
        .unwrap();
        user.password_hash = "secret-hash".into();
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password"));
    }
}
