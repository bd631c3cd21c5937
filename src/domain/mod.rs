//! Business records stored in the relational tables, plus the input shapes the
//! API accepts for them. Inputs double as partial updates: a field left out of
//! a PUT body leaves the stored value untouched, an empty string clears it.

use crate::constants::{STATUS_DRAFT, STATUS_IN_REVIEW, STATUS_PUBLISHED};
use crate::error::{CmsError, Result};
use serde::{Deserialize, Serialize};

pub mod contact;
pub mod posts;
pub mod site;
pub mod users;

pub use contact::*;
pub use posts::*;
pub use site::*;
pub use users::*;

/// Content lifecycle of blog and service posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostStatus {
    Draft,
    Published,
    InReview,
}

impl PostStatus {
    pub fn id(self) -> i64 {
        match self {
            PostStatus::Draft => STATUS_DRAFT,
            PostStatus::Published => STATUS_PUBLISHED,
            PostStatus::InReview => STATUS_IN_REVIEW,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            STATUS_DRAFT => Some(PostStatus::Draft),
            STATUS_PUBLISHED => Some(PostStatus::Published),
            STATUS_IN_REVIEW => Some(PostStatus::InReview),
            _ => None,
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            "in-review" | "in_review" | "review" => Ok(PostStatus::InReview),
            other => Err(CmsError::validation(format!(
                "Invalid status '{other}', expected draft, published or in-review"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::InReview => "in-review",
        }
    }
}

/// Accepts either `["a", "b"]` or the comma-joined form `"a, b"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Joined(String),
}

impl TagsInput {
    pub fn into_tags(self) -> Vec<String> {
        match self {
            TagsInput::List(list) => crate::content::parse_tags(&list.join(",")),
            TagsInput::Joined(raw) => crate::content::parse_tags(&raw),
        }
    }
}

/// Trimmed value of a required text field; absent or blank is a validation error.
pub(crate) fn required(value: &Option<String>, field: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(CmsError::validation(format!("{field} is required"))),
    }
}

/// Optional text: blank becomes `None`.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Applies an optional-text patch: absent keeps, blank clears, anything else replaces.
pub(crate) fn merge_optional(target: &mut Option<String>, patch: Option<String>) {
    if let Some(v) = patch {
        *target = optional(Some(v));
    }
}

/// Applies a required-text patch: absent keeps, blank is rejected.
pub(crate) fn merge_required(target: &mut String, patch: &Option<String>, field: &str) -> Result<()> {
    if patch.is_some() {
        *target = required(patch, field)?;
    }
    Ok(())
}

pub(crate) fn merge<T>(target: &mut T, patch: Option<T>) {
    if let Some(v) = patch {
        *target = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ids_match_lifecycle_table() {
        assert_eq!(PostStatus::parse("published").unwrap().id(), 2);
        assert_eq!(PostStatus::parse("draft").unwrap().id(), 1);
        assert_eq!(PostStatus::parse("in-review").unwrap().id(), 3);
        assert_eq!(PostStatus::parse("In_Review").unwrap(), PostStatus::InReview);
        assert!(PostStatus::parse("archived").is_err());
        assert_eq!(PostStatus::from_id(2), Some(PostStatus::Published));
        assert_eq!(PostStatus::from_id(9), None);
    }

    #[test]
    fn status_serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&PostStatus::InReview).unwrap(), "\"in-review\"");
    }

    #[test]
    fn tags_input_accepts_both_shapes() {
        let list: TagsInput = serde_json::from_str(r#"["SEO", " seo ", "Video"]"#).unwrap();
        assert_eq!(list.into_tags(), vec!["SEO", "Video"]);
        let joined: TagsInput = serde_json::from_str(r#""a, b""#).unwrap();
        assert_eq!(joined.into_tags(), vec!["a", "b"]);
    }

    #[test]
    fn optional_patch_semantics() {
        let mut value = Some("old".to_string());
        merge_optional(&mut value, None);
        assert_eq!(value.as_deref(), Some("old"));
        merge_optional(&mut value, Some("  ".to_string()));
        assert_eq!(value, None);

        let mut title = "Title".to_string();
        assert!(merge_required(&mut title, &Some(" ".to_string()), "title").is_err());
        merge_required(&mut title, &Some(" New ".to_string()), "title").unwrap();
        assert_eq!(title, "New");
    }
}
