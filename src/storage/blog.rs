use super::{conflict_on_unique, expect_changed, like_pattern, Database, SqlFilter};
use crate::content;
use crate::domain::{BlogPost, BlogQuery, PostStatus};
use crate::error::Result;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

const SELECT_POST: &str = "SELECT b.id, b.title, b.slug, b.excerpt, b.content, b.featured_image, b.tags, \
     b.author_id, u.name, b.status_id, b.read_time, b.is_featured, b.published_at, b.created_at, b.updated_at \
     FROM blog_posts b LEFT JOIN users u ON u.id = b.author_id";

fn row_to_post(row: &Row<'_>) -> rusqlite::Result<BlogPost> {
    let status_id: i64 = row.get(9)?;
    let tags: String = row.get(6)?;
    Ok(BlogPost {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        excerpt: row.get(3)?,
        content: row.get(4)?,
        featured_image: row.get(5)?,
        tags: content::parse_tags(&tags),
        author_id: row.get(7)?,
        author_name: row.get(8)?,
        status: PostStatus::from_id(status_id).unwrap_or(PostStatus::Draft),
        status_id,
        read_time: row.get(10)?,
        is_featured: row.get(11)?,
        published_at: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn blog_filter(query: &BlogQuery) -> SqlFilter {
    let mut filter = SqlFilter::default();
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        filter.push_repeated(
            "(b.title LIKE ? ESCAPE '\\' OR b.excerpt LIKE ? ESCAPE '\\' OR b.content LIKE ? ESCAPE '\\')",
            like_pattern(search),
        );
    }
    if let Some(category) = query.category.as_deref().filter(|s| !s.trim().is_empty()) {
        let tag = category.trim().to_lowercase().replace('%', "").replace('_', "\\_");
        filter.push(
            "(',' || lower(b.tags) || ',') LIKE ? ESCAPE '\\'",
            format!("%,{tag},%"),
        );
    }
    if let Some(status) = query.status {
        filter.push("b.status_id = ?", status.id());
    }
    if let Some(featured) = query.featured {
        filter.push("b.is_featured = ?", featured);
    }
    filter
}

impl Database {
    pub fn create_blog_post(&self, post: &mut BlogPost) -> Result<()> {
        let slug = post.slug.clone();
        let id = conflict_on_unique(
            self.with_conn(|conn| {
                conn.execute(
                    "INSERT INTO blog_posts (title, slug, excerpt, content, featured_image, tags, author_id, \
                     status_id, read_time, is_featured, published_at, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                    params![
                        post.title,
                        post.slug,
                        post.excerpt,
                        post.content,
                        post.featured_image,
                        content::join_tags(&post.tags),
                        post.author_id,
                        post.status_id,
                        post.read_time,
                        post.is_featured,
                        post.published_at,
                        post.created_at,
                        post.updated_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            }),
            || format!("A blog post with slug '{slug}' already exists"),
        )?;
        post.id = id;
        debug!("Created blog post: {} with id {}", post.title, id);
        Ok(())
    }

    pub fn get_blog_post(&self, id: i64) -> Result<Option<BlogPost>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(&format!("{SELECT_POST} WHERE b.id = ?1"), params![id], row_to_post)
                .optional()?)
        })
    }

    pub fn get_blog_post_by_slug(&self, slug: &str) -> Result<Option<BlogPost>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(&format!("{SELECT_POST} WHERE b.slug = ?1"), params![slug], row_to_post)
                .optional()?)
        })
    }

    /// One page of posts plus the total count of the filtered set.
    pub fn list_blog_posts(&self, query: &BlogQuery) -> Result<(Vec<BlogPost>, usize)> {
        let filter = blog_filter(query);
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM blog_posts b LEFT JOIN users u ON u.id = b.author_id{}",
                    filter.where_sql()
                ),
                filter.params().as_slice(),
                |r| r.get(0),
            )?;

            let limit = query.page.limit as i64;
            let offset = query.page.offset as i64;
            let sql = format!(
                "{SELECT_POST}{} ORDER BY COALESCE(b.published_at, b.created_at) DESC, b.id DESC LIMIT ? OFFSET ?",
                filter.where_sql()
            );
            let mut stmt = conn.prepare(&sql)?;
            let posts = stmt
                .query_map(filter.params_with(&[&limit, &offset]).as_slice(), row_to_post)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok((posts, total as usize))
        })
    }

    pub fn update_blog_post(&self, post: &BlogPost) -> Result<()> {
        let slug = post.slug.clone();
        conflict_on_unique(
            self.with_conn(|conn| {
                let changed = conn.execute(
                    "UPDATE blog_posts SET title = ?1, slug = ?2, excerpt = ?3, content = ?4, featured_image = ?5, \
                     tags = ?6, author_id = ?7, status_id = ?8, read_time = ?9, is_featured = ?10, \
                     published_at = ?11, updated_at = ?12 WHERE id = ?13",
                    params![
                        post.title,
                        post.slug,
                        post.excerpt,
                        post.content,
                        post.featured_image,
                        content::join_tags(&post.tags),
                        post.author_id,
                        post.status_id,
                        post.read_time,
                        post.is_featured,
                        post.published_at,
                        post.updated_at,
                        post.id,
                    ],
                )?;
                expect_changed(changed, "Blog post")
            }),
            || format!("A blog post with slug '{slug}' already exists"),
        )
    }

    pub fn delete_blog_post(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM blog_posts WHERE id = ?1", params![id])?;
            expect_changed(changed, "Blog post")
        })
    }

    /// Tag lists of every published post, for category aggregation.
    pub fn published_blog_tags(&self) -> Result<Vec<Vec<String>>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT tags FROM blog_posts WHERE status_id = ?1")?;
            let rows = stmt
                .query_map(params![PostStatus::Published.id()], |r| r.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows.iter().map(|t| content::parse_tags(t)).collect())
        })
    }

    pub fn clear_blog_posts(&self) -> Result<usize> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM blog_posts", [])?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Pagination;
    use crate::domain::BlogPostInput;
    use crate::error::CmsError;

    fn new_post(db: &Database, title: &str, status: &str, tags: &str) -> BlogPost {
        let mut post = BlogPostInput {
            title: Some(title.to_string()),
            content: Some(format!("<p>All about {title}</p>")),
            status: Some(status.to_string()),
            tags: Some(crate::domain::TagsInput::Joined(tags.to_string())),
            ..Default::default()
        }
        .into_post()
        .unwrap();
        db.create_blog_post(&mut post).unwrap();
        post
    }

    #[test]
    fn create_then_read_back() {
        let db = Database::open_in_memory().unwrap();
        let post = new_post(&db, "Content Audits", "published", "SEO, Strategy");
        let loaded = db.get_blog_post(post.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Content Audits");
        assert_eq!(loaded.tags, vec!["SEO", "Strategy"]);
        assert_eq!(loaded.status_id, 2);
        assert_eq!(db.get_blog_post_by_slug("content-audits").unwrap().unwrap().id, post.id);
    }

    #[test]
    fn duplicate_slug_is_a_conflict() {
        let db = Database::open_in_memory().unwrap();
        let original = new_post(&db, "Hello", "draft", "");
        let mut dup = BlogPostInput {
            title: Some("Hello".into()),
            content: Some("other".into()),
            ..Default::default()
        }
        .into_post()
        .unwrap();
        let err = db.create_blog_post(&mut dup).unwrap_err();
        assert!(matches!(err, CmsError::Conflict(_)));
        assert_eq!(db.get_blog_post(original.id).unwrap().unwrap().content, original.content);
    }

    #[test]
    fn list_filters_and_counts() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..5 {
            new_post(&db, &format!("Post {i}"), "published", "SEO");
        }
        new_post(&db, "Video tips", "published", "Video");
        new_post(&db, "Unfinished", "draft", "SEO");

        let query = BlogQuery {
            status: Some(PostStatus::Published),
            page: Pagination::new(Some(2), Some(0)),
            ..Default::default()
        };
        let (posts, total) = db.list_blog_posts(&query).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(total, 6);

        let query = BlogQuery {
            category: Some("seo".into()),
            ..Default::default()
        };
        assert_eq!(db.list_blog_posts(&query).unwrap().1, 6);

        let query = BlogQuery {
            search: Some("video".into()),
            ..Default::default()
        };
        let (posts, total) = db.list_blog_posts(&query).unwrap();
        assert_eq!(total, 1);
        assert_eq!(posts[0].title, "Video tips");
    }

    #[test]
    fn delete_missing_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.delete_blog_post(42), Err(CmsError::NotFound(_))));
    }
}
