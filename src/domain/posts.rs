use super::{merge, merge_optional, merge_required, optional, required, PostStatus, TagsInput};
use crate::constants::EXCERPT_CHARS;
use crate::content::{self, Pagination};
use crate::error::{CmsError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub featured_image: Option<String>,
    pub tags: Vec<String>,
    pub author_id: Option<i64>,
    pub author_name: Option<String>,
    pub status: PostStatus,
    pub status_id: i64,
    pub read_time: i64,
    pub is_featured: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlogPostInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    pub tags: Option<TagsInput>,
    pub author_id: Option<i64>,
    pub status: Option<String>,
    pub is_featured: Option<bool>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct BlogQuery {
    pub search: Option<String>,
    /// Tag name, matched case-insensitively against the post's tags.
    pub category: Option<String>,
    pub status: Option<PostStatus>,
    pub featured: Option<bool>,
    pub page: Pagination,
}

/// Slug from the explicit value, or derived from the title.
fn resolve_slug(slug: Option<String>, title: &str) -> Result<String> {
    let slug = match optional(slug) {
        Some(s) => content::slugify(&s),
        None => content::slugify(title),
    };
    if slug.is_empty() {
        return Err(CmsError::validation("slug could not be derived from the title"));
    }
    Ok(slug)
}

/// Applies an excerpt patch after a possible content change. An explicit
/// excerpt wins; a blank one, or a previous excerpt that was derived from the
/// old content, is re-derived from the current content.
fn merge_excerpt(excerpt: &mut Option<String>, patch: Option<String>, old_content: &str, content: &str) {
    let derived = || Some(content::excerpt(content, EXCERPT_CHARS));
    match patch {
        Some(value) => *excerpt = optional(Some(value)).or_else(derived),
        None if old_content != content => {
            let was_derived = excerpt
                .as_deref()
                .map_or(true, |e| e == content::excerpt(old_content, EXCERPT_CHARS));
            if was_derived {
                *excerpt = derived();
            }
        }
        None => {}
    }
}

fn parse_status(status: Option<String>) -> Result<PostStatus> {
    match optional(status) {
        Some(s) => PostStatus::parse(&s),
        None => Ok(PostStatus::Draft),
    }
}

impl BlogPostInput {
    /// Builds a new post; `id` is assigned by storage.
    pub fn into_post(self) -> Result<BlogPost> {
        let title = required(&self.title, "title")?;
        let body = required(&self.content, "content")?;
        let slug = resolve_slug(self.slug, &title)?;
        let status = parse_status(self.status)?;
        let now = Utc::now();

        let published_at = match (self.published_at, status) {
            (Some(ts), _) => Some(ts),
            (None, PostStatus::Published) => Some(now),
            (None, _) => None,
        };

        Ok(BlogPost {
            id: 0,
            excerpt: optional(self.excerpt).or_else(|| Some(content::excerpt(&body, EXCERPT_CHARS))),
            read_time: content::read_time_minutes(&body),
            featured_image: optional(self.featured_image),
            tags: self.tags.map(TagsInput::into_tags).unwrap_or_default(),
            author_id: self.author_id,
            author_name: None,
            status_id: status.id(),
            status,
            is_featured: self.is_featured.unwrap_or(false),
            published_at,
            created_at: now,
            updated_at: now,
            title,
            slug,
            content: body,
        })
    }

    /// Merges the provided fields into `post`.
    pub fn apply_to(self, post: &mut BlogPost) -> Result<()> {
        merge_required(&mut post.title, &self.title, "title")?;
        let old_content = post.content.clone();
        if self.content.is_some() {
            merge_required(&mut post.content, &self.content, "content")?;
            post.read_time = content::read_time_minutes(&post.content);
        }
        if self.slug.is_some() {
            post.slug = resolve_slug(self.slug, &post.title)?;
        }
        merge_excerpt(&mut post.excerpt, self.excerpt, &old_content, &post.content);
        merge_optional(&mut post.featured_image, self.featured_image);
        if let Some(tags) = self.tags {
            post.tags = tags.into_tags();
        }
        if self.author_id.is_some() {
            post.author_id = self.author_id;
        }
        merge(&mut post.is_featured, self.is_featured);
        if self.status.is_some() {
            post.status = parse_status(self.status)?;
            post.status_id = post.status.id();
        }
        if self.published_at.is_some() {
            post.published_at = self.published_at;
        } else if post.status == PostStatus::Published && post.published_at.is_none() {
            post.published_at = Some(Utc::now());
        }
        post.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCategory {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub display_order: i64,
    pub is_active: bool,
    #[serde(default)]
    pub subcategories: Vec<ServiceSubcategory>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceCategoryInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,
}

impl ServiceCategoryInput {
    pub fn into_category(self) -> Result<ServiceCategory> {
        let name = required(&self.name, "name")?;
        let now = Utc::now();
        Ok(ServiceCategory {
            id: 0,
            slug: resolve_slug(self.slug, &name)?,
            name,
            description: optional(self.description),
            icon: optional(self.icon),
            display_order: self.display_order.unwrap_or(0),
            is_active: self.is_active.unwrap_or(true),
            subcategories: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_to(self, category: &mut ServiceCategory) -> Result<()> {
        merge_required(&mut category.name, &self.name, "name")?;
        if self.slug.is_some() {
            category.slug = resolve_slug(self.slug, &category.name)?;
        }
        merge_optional(&mut category.description, self.description);
        merge_optional(&mut category.icon, self.icon);
        merge(&mut category.display_order, self.display_order);
        merge(&mut category.is_active, self.is_active);
        category.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSubcategory {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub display_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceSubcategoryInput {
    pub category_id: Option<i64>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,
}

impl ServiceSubcategoryInput {
    pub fn into_subcategory(self) -> Result<ServiceSubcategory> {
        let category_id = self
            .category_id
            .ok_or_else(|| CmsError::validation("category_id is required"))?;
        let name = required(&self.name, "name")?;
        let now = Utc::now();
        Ok(ServiceSubcategory {
            id: 0,
            category_id,
            slug: resolve_slug(self.slug, &name)?,
            name,
            description: optional(self.description),
            display_order: self.display_order.unwrap_or(0),
            is_active: self.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_to(self, sub: &mut ServiceSubcategory) -> Result<()> {
        merge(&mut sub.category_id, self.category_id);
        merge_required(&mut sub.name, &self.name, "name")?;
        if self.slug.is_some() {
            sub.slug = resolve_slug(self.slug, &sub.name)?;
        }
        merge_optional(&mut sub.description, self.description);
        merge(&mut sub.display_order, self.display_order);
        merge(&mut sub.is_active, self.is_active);
        sub.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePost {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub featured_image: Option<String>,
    pub icon: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub subcategory_id: Option<i64>,
    pub author_id: Option<i64>,
    pub status: PostStatus,
    pub status_id: i64,
    pub read_time: i64,
    pub display_order: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicePostInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    pub icon: Option<String>,
    pub category_id: Option<i64>,
    pub subcategory_id: Option<i64>,
    pub author_id: Option<i64>,
    pub status: Option<String>,
    pub display_order: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceQuery {
    pub search: Option<String>,
    /// Category slug or numeric id.
    pub category: Option<String>,
    /// Subcategory slug or numeric id.
    pub subcategory: Option<String>,
    pub status: Option<PostStatus>,
    pub page: Pagination,
}

impl ServicePostInput {
    pub fn into_post(self) -> Result<ServicePost> {
        let title = required(&self.title, "title")?;
        let body = required(&self.content, "content")?;
        let status = parse_status(self.status)?;
        let now = Utc::now();
        Ok(ServicePost {
            id: 0,
            slug: resolve_slug(self.slug, &title)?,
            excerpt: optional(self.excerpt).or_else(|| Some(content::excerpt(&body, EXCERPT_CHARS))),
            read_time: content::read_time_minutes(&body),
            featured_image: optional(self.featured_image),
            icon: optional(self.icon),
            category_id: self.category_id,
            category_name: None,
            subcategory_id: self.subcategory_id,
            author_id: self.author_id,
            status_id: status.id(),
            status,
            display_order: self.display_order.unwrap_or(0),
            published_at: (status == PostStatus::Published).then_some(now),
            created_at: now,
            updated_at: now,
            title,
            content: body,
        })
    }

    pub fn apply_to(self, post: &mut ServicePost) -> Result<()> {
        merge_required(&mut post.title, &self.title, "title")?;
        let old_content = post.content.clone();
        if self.content.is_some() {
            merge_required(&mut post.content, &self.content, "content")?;
            post.read_time = content::read_time_minutes(&post.content);
        }
        if self.slug.is_some() {
            post.slug = resolve_slug(self.slug, &post.title)?;
        }
        merge_excerpt(&mut post.excerpt, self.excerpt, &old_content, &post.content);
        merge_optional(&mut post.featured_image, self.featured_image);
        merge_optional(&mut post.icon, self.icon);
        if self.category_id.is_some() {
            post.category_id = self.category_id;
        }
        if self.subcategory_id.is_some() {
            post.subcategory_id = self.subcategory_id;
        }
        if self.author_id.is_some() {
            post.author_id = self.author_id;
        }
        merge(&mut post.display_order, self.display_order);
        if self.status.is_some() {
            post.status = parse_status(self.status)?;
            post.status_id = post.status.id();
            if post.status == PostStatus::Published && post.published_at.is_none() {
                post.published_at = Some(Utc::now());
            }
        }
        post.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str, content: &str) -> BlogPostInput {
        BlogPostInput {
            title: Some(title.to_string()),
            content: Some(content.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn new_post_derives_slug_excerpt_and_read_time() {
        let post = input("Ten Content Ideas!", "<p>Write more.</p>").into_post().unwrap();
        assert_eq!(post.slug, "ten-content-ideas");
        assert_eq!(post.excerpt.as_deref(), Some("Write more."));
        assert_eq!(post.read_time, 1);
        assert_eq!(post.status, PostStatus::Draft);
        assert_eq!(post.status_id, 1);
        assert!(post.published_at.is_none());
    }

    #[test]
    fn derived_excerpt_follows_content_edits() {
        let mut post = input("Hello", "<p>First draft.</p>").into_post().unwrap();
        BlogPostInput { content: Some("<p>Second draft.</p>".into()), ..Default::default() }
            .apply_to(&mut post)
            .unwrap();
        assert_eq!(post.excerpt.as_deref(), Some("Second draft."));

        BlogPostInput { excerpt: Some("Hand written.".into()), ..Default::default() }
            .apply_to(&mut post)
            .unwrap();
        BlogPostInput { content: Some("<p>Third draft.</p>".into()), ..Default::default() }
            .apply_to(&mut post)
            .unwrap();
        assert_eq!(post.excerpt.as_deref(), Some("Hand written."));
    }

    #[test]
    fn service_excerpt_is_rederived_when_content_changes() {
        let mut service = ServicePostInput {
            title: Some("SEO".into()),
            content: Some("Old copy".into()),
            ..Default::default()
        }
        .into_post()
        .unwrap();
        ServicePostInput { content: Some("New copy".into()), ..Default::default() }
            .apply_to(&mut service)
            .unwrap();
        assert_eq!(service.excerpt.as_deref(), Some("New copy"));
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        let err = BlogPostInput { title: Some("x".into()), ..Default::default() }
            .into_post()
            .unwrap_err();
        assert!(matches!(err, CmsError::Validation(ref m) if m.contains("content")));
        assert!(input("!!!", "body").into_post().is_err());
    }

    #[test]
    fn publishing_stamps_published_at() {
        let mut post = input("Hello", "body").into_post().unwrap();
        BlogPostInput { status: Some("published".into()), ..Default::default() }
            .apply_to(&mut post)
            .unwrap();
        assert_eq!(post.status_id, 2);
        assert!(post.published_at.is_some());
    }

    #[test]
    fn partial_update_touches_only_given_fields() {
        let mut post = input("Hello", "body").into_post().unwrap();
        post.featured_image = Some("/uploads/a.png".into());
        BlogPostInput { title: Some("Renamed".into()), ..Default::default() }
            .apply_to(&mut post)
            .unwrap();
        assert_eq!(post.title, "Renamed");
        assert_eq!(post.slug, "hello");
        assert_eq!(post.content, "body");
        assert_eq!(post.featured_image.as_deref(), Some("/uploads/a.png"));
    }

    #[test]
    fn subcategory_requires_category() {
        let err = ServiceSubcategoryInput { name: Some("Local SEO".into()), ..Default::default() }
            .into_subcategory()
            .unwrap_err();
        assert!(err.to_string().contains("category_id"));
    }
}
