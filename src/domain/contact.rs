use super::users::normalize_email;
use super::{optional, required};
use crate::error::{CmsError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_MESSAGE_CHARS: usize = 5000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactSubmission {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub service: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Public contact form body. Accepted as JSON or as a urlencoded form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub service: Option<String>,
    pub message: Option<String>,
}

impl ContactInput {
    pub fn into_submission(self) -> Result<ContactSubmission> {
        let name = required(&self.name, "name")?;
        let email = normalize_email(&required(&self.email, "email")?)?;
        let message = required(&self.message, "message")?;
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(CmsError::validation(format!(
                "message must be at most {MAX_MESSAGE_CHARS} characters"
            )));
        }
        Ok(ContactSubmission {
            id: 0,
            name,
            email,
            phone: optional(self.phone),
            company: optional(self.company),
            service: optional(self.service),
            message,
            is_read: false,
            created_at: Utc::now(),
        })
    }
}

impl ContactSubmission {
    pub fn notification_subject(&self) -> String {
        format!("New contact request from {}", self.name)
    }

    pub fn notification_body(&self) -> String {
        let mut body = format!("Name: {}\nEmail: {}\n", self.name, self.email);
        for (label, value) in [
            ("Phone", &self.phone),
            ("Company", &self.company),
            ("Service", &self.service),
        ] {
            if let Some(v) = value {
                body.push_str(&format!("{label}: {v}\n"));
            }
        }
        body.push_str(&format!("\n{}\n", self.message));
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_requires_name_email_message() {
        let err = ContactInput {
            name: Some("Sam".into()),
            email: Some("sam@example.com".into()),
            ..Default::default()
        }
        .into_submission()
        .unwrap_err();
        assert_eq!(err.to_string(), "message is required");
    }

    #[test]
    fn notification_lists_only_present_fields() {
        let sub = ContactInput {
            name: Some("Sam".into()),
            email: Some("sam@example.com".into()),
            company: Some("Acme".into()),
            phone: Some("  ".into()),
            message: Some("Need a content audit".into()),
            ..Default::default()
        }
        .into_submission()
        .unwrap();
        let body = sub.notification_body();
        assert!(body.contains("Company: Acme"));
        assert!(!body.contains("Phone"));
        assert!(body.ends_with("Need a content audit\n"));
    }
}
