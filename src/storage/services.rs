use super::{conflict_on_unique, expect_changed, like_pattern, Database, SqlFilter};
use crate::domain::{PostStatus, ServiceCategory, ServicePost, ServiceQuery, ServiceSubcategory};
use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

const SELECT_CATEGORY: &str = "SELECT id, name, slug, description, icon, display_order, is_active, \
     created_at, updated_at FROM service_categories";

const SELECT_SUBCATEGORY: &str = "SELECT id, category_id, name, slug, description, display_order, is_active, \
     created_at, updated_at FROM service_subcategories";

const SELECT_SERVICE: &str = "SELECT s.id, s.title, s.slug, s.excerpt, s.content, s.featured_image, s.icon, \
     s.category_id, c.name, s.subcategory_id, s.author_id, s.status_id, s.read_time, s.display_order, \
     s.published_at, s.created_at, s.updated_at \
     FROM service_posts s \
     LEFT JOIN service_categories c ON c.id = s.category_id \
     LEFT JOIN service_subcategories sc ON sc.id = s.subcategory_id";

fn row_to_category(row: &Row<'_>) -> rusqlite::Result<ServiceCategory> {
    Ok(ServiceCategory {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        icon: row.get(4)?,
        display_order: row.get(5)?,
        is_active: row.get(6)?,
        subcategories: Vec::new(),
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn row_to_subcategory(row: &Row<'_>) -> rusqlite::Result<ServiceSubcategory> {
    Ok(ServiceSubcategory {
        id: row.get(0)?,
        category_id: row.get(1)?,
        name: row.get(2)?,
        slug: row.get(3)?,
        description: row.get(4)?,
        display_order: row.get(5)?,
        is_active: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn row_to_service(row: &Row<'_>) -> rusqlite::Result<ServicePost> {
    let status_id: i64 = row.get(11)?;
    Ok(ServicePost {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        excerpt: row.get(3)?,
        content: row.get(4)?,
        featured_image: row.get(5)?,
        icon: row.get(6)?,
        category_id: row.get(7)?,
        category_name: row.get(8)?,
        subcategory_id: row.get(9)?,
        author_id: row.get(10)?,
        status: PostStatus::from_id(status_id).unwrap_or(PostStatus::Draft),
        status_id,
        read_time: row.get(12)?,
        display_order: row.get(13)?,
        published_at: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

fn subcategories_of(conn: &Connection, category_id: i64, include_inactive: bool) -> Result<Vec<ServiceSubcategory>> {
    let sql = format!(
        "{SELECT_SUBCATEGORY} WHERE category_id = ?1{} ORDER BY display_order, id",
        if include_inactive { "" } else { " AND is_active = 1" }
    );
    let mut stmt = conn.prepare(&sql)?;
    let subs = stmt
        .query_map(params![category_id], row_to_subcategory)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(subs)
}

/// Adds an "id or slug" match for a joined table alias.
fn push_key(filter: &mut SqlFilter, alias: &str, key: &str) {
    match key.trim().parse::<i64>() {
        Ok(id) => filter.push(&format!("{alias}.id = ?"), id),
        Err(_) => filter.push(&format!("{alias}.slug = ?"), key.trim().to_string()),
    }
}

impl Database {
    // Categories

    pub fn create_service_category(&self, category: &mut ServiceCategory) -> Result<()> {
        let slug = category.slug.clone();
        category.id = conflict_on_unique(
            self.with_conn(|conn| {
                conn.execute(
                    "INSERT INTO service_categories (name, slug, description, icon, display_order, is_active, \
                     created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        category.name,
                        category.slug,
                        category.description,
                        category.icon,
                        category.display_order,
                        category.is_active,
                        category.created_at,
                        category.updated_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            }),
            || format!("A service category with slug '{slug}' already exists"),
        )?;
        debug!("Created service category: {} with id {}", category.name, category.id);
        Ok(())
    }

    pub fn get_service_category(&self, id: i64) -> Result<Option<ServiceCategory>> {
        self.with_conn(|conn| {
            let category = conn
                .query_row(&format!("{SELECT_CATEGORY} WHERE id = ?1"), params![id], row_to_category)
                .optional()?;
            match category {
                Some(mut c) => {
                    c.subcategories = subcategories_of(conn, c.id, true)?;
                    Ok(Some(c))
                }
                None => Ok(None),
            }
        })
    }

    /// Categories in display order, each with its subcategories.
    pub fn list_service_categories(&self, include_inactive: bool) -> Result<Vec<ServiceCategory>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{SELECT_CATEGORY}{} ORDER BY display_order, id",
                if include_inactive { "" } else { " WHERE is_active = 1" }
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut categories = stmt
                .query_map([], row_to_category)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for category in categories.iter_mut() {
                category.subcategories = subcategories_of(conn, category.id, include_inactive)?;
            }
            Ok(categories)
        })
    }

    pub fn update_service_category(&self, category: &ServiceCategory) -> Result<()> {
        let slug = category.slug.clone();
        conflict_on_unique(
            self.with_conn(|conn| {
                let changed = conn.execute(
                    "UPDATE service_categories SET name = ?1, slug = ?2, description = ?3, icon = ?4, \
                     display_order = ?5, is_active = ?6, updated_at = ?7 WHERE id = ?8",
                    params![
                        category.name,
                        category.slug,
                        category.description,
                        category.icon,
                        category.display_order,
                        category.is_active,
                        category.updated_at,
                        category.id,
                    ],
                )?;
                expect_changed(changed, "Service category")
            }),
            || format!("A service category with slug '{slug}' already exists"),
        )
    }

    pub fn delete_service_category(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM service_categories WHERE id = ?1", params![id])?;
            expect_changed(changed, "Service category")
        })
    }

    // Subcategories

    pub fn create_service_subcategory(&self, sub: &mut ServiceSubcategory) -> Result<()> {
        let slug = sub.slug.clone();
        sub.id = conflict_on_unique(
            self.with_conn(|conn| {
                conn.execute(
                    "INSERT INTO service_subcategories (category_id, name, slug, description, display_order, \
                     is_active, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        sub.category_id,
                        sub.name,
                        sub.slug,
                        sub.description,
                        sub.display_order,
                        sub.is_active,
                        sub.created_at,
                        sub.updated_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            }),
            || format!("A service subcategory with slug '{slug}' already exists"),
        )?;
        Ok(())
    }

    pub fn get_service_subcategory(&self, id: i64) -> Result<Option<ServiceSubcategory>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("{SELECT_SUBCATEGORY} WHERE id = ?1"),
                    params![id],
                    row_to_subcategory,
                )
                .optional()?)
        })
    }

    pub fn list_service_subcategories(&self, category_id: Option<i64>) -> Result<Vec<ServiceSubcategory>> {
        self.with_conn(|conn| match category_id {
            Some(id) => subcategories_of(conn, id, true),
            None => {
                let mut stmt =
                    conn.prepare(&format!("{SELECT_SUBCATEGORY} ORDER BY category_id, display_order, id"))?;
                let subs = stmt
                    .query_map([], row_to_subcategory)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(subs)
            }
        })
    }

    pub fn update_service_subcategory(&self, sub: &ServiceSubcategory) -> Result<()> {
        let slug = sub.slug.clone();
        conflict_on_unique(
            self.with_conn(|conn| {
                let changed = conn.execute(
                    "UPDATE service_subcategories SET category_id = ?1, name = ?2, slug = ?3, description = ?4, \
                     display_order = ?5, is_active = ?6, updated_at = ?7 WHERE id = ?8",
                    params![
                        sub.category_id,
                        sub.name,
                        sub.slug,
                        sub.description,
                        sub.display_order,
                        sub.is_active,
                        sub.updated_at,
                        sub.id,
                    ],
                )?;
                expect_changed(changed, "Service subcategory")
            }),
            || format!("A service subcategory with slug '{slug}' already exists"),
        )
    }

    pub fn delete_service_subcategory(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM service_subcategories WHERE id = ?1", params![id])?;
            expect_changed(changed, "Service subcategory")
        })
    }

    // Service posts

    pub fn create_service_post(&self, post: &mut ServicePost) -> Result<()> {
        let slug = post.slug.clone();
        post.id = conflict_on_unique(
            self.with_conn(|conn| {
                conn.execute(
                    "INSERT INTO service_posts (title, slug, excerpt, content, featured_image, icon, category_id, \
                     subcategory_id, author_id, status_id, read_time, display_order, published_at, created_at, \
                     updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                    params![
                        post.title,
                        post.slug,
                        post.excerpt,
                        post.content,
                        post.featured_image,
                        post.icon,
                        post.category_id,
                        post.subcategory_id,
                        post.author_id,
                        post.status_id,
                        post.read_time,
                        post.display_order,
                        post.published_at,
                        post.created_at,
                        post.updated_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            }),
            || format!("A service with slug '{slug}' already exists"),
        )?;
        debug!("Created service post: {} with id {}", post.title, post.id);
        Ok(())
    }

    pub fn get_service_post(&self, id: i64) -> Result<Option<ServicePost>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(&format!("{SELECT_SERVICE} WHERE s.id = ?1"), params![id], row_to_service)
                .optional()?)
        })
    }

    pub fn get_service_post_by_slug(&self, slug: &str) -> Result<Option<ServicePost>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(&format!("{SELECT_SERVICE} WHERE s.slug = ?1"), params![slug], row_to_service)
                .optional()?)
        })
    }

    pub fn list_service_posts(&self, query: &ServiceQuery) -> Result<(Vec<ServicePost>, usize)> {
        let mut filter = SqlFilter::default();
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            filter.push_repeated(
                "(s.title LIKE ? ESCAPE '\\' OR s.excerpt LIKE ? ESCAPE '\\' OR s.content LIKE ? ESCAPE '\\')",
                like_pattern(search),
            );
        }
        if let Some(category) = query.category.as_deref().filter(|s| !s.trim().is_empty()) {
            push_key(&mut filter, "c", category);
        }
        if let Some(sub) = query.subcategory.as_deref().filter(|s| !s.trim().is_empty()) {
            push_key(&mut filter, "sc", sub);
        }
        if let Some(status) = query.status {
            filter.push("s.status_id = ?", status.id());
        }

        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM service_posts s \
                     LEFT JOIN service_categories c ON c.id = s.category_id \
                     LEFT JOIN service_subcategories sc ON sc.id = s.subcategory_id{}",
                    filter.where_sql()
                ),
                filter.params().as_slice(),
                |r| r.get(0),
            )?;
            let limit = query.page.limit as i64;
            let offset = query.page.offset as i64;
            let sql = format!(
                "{SELECT_SERVICE}{} ORDER BY s.display_order, s.id LIMIT ? OFFSET ?",
                filter.where_sql()
            );
            let mut stmt = conn.prepare(&sql)?;
            let posts = stmt
                .query_map(filter.params_with(&[&limit, &offset]).as_slice(), row_to_service)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok((posts, total as usize))
        })
    }

    pub fn update_service_post(&self, post: &ServicePost) -> Result<()> {
        let slug = post.slug.clone();
        conflict_on_unique(
            self.with_conn(|conn| {
                let changed = conn.execute(
                    "UPDATE service_posts SET title = ?1, slug = ?2, excerpt = ?3, content = ?4, \
                     featured_image = ?5, icon = ?6, category_id = ?7, subcategory_id = ?8, author_id = ?9, \
                     status_id = ?10, read_time = ?11, display_order = ?12, published_at = ?13, updated_at = ?14 \
                     WHERE id = ?15",
                    params![
                        post.title,
                        post.slug,
                        post.excerpt,
                        post.content,
                        post.featured_image,
                        post.icon,
                        post.category_id,
                        post.subcategory_id,
                        post.author_id,
                        post.status_id,
                        post.read_time,
                        post.display_order,
                        post.published_at,
                        post.updated_at,
                        post.id,
                    ],
                )?;
                expect_changed(changed, "Service")
            }),
            || format!("A service with slug '{slug}' already exists"),
        )
    }

    pub fn delete_service_post(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM service_posts WHERE id = ?1", params![id])?;
            expect_changed(changed, "Service")
        })
    }

    pub fn clear_services(&self) -> Result<()> {
        self.with_tx(|tx| {
            tx.execute("DELETE FROM service_posts", [])?;
            tx.execute("DELETE FROM service_subcategories", [])?;
            tx.execute("DELETE FROM service_categories", [])?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ServiceCategoryInput, ServicePostInput, ServiceSubcategoryInput};
    use crate::error::CmsError;

    fn seed_category(db: &Database) -> (ServiceCategory, ServiceSubcategory) {
        let mut category = ServiceCategoryInput {
            name: Some("Content Marketing".into()),
            ..Default::default()
        }
        .into_category()
        .unwrap();
        db.create_service_category(&mut category).unwrap();
        let mut sub = ServiceSubcategoryInput {
            category_id: Some(category.id),
            name: Some("Blog Writing".into()),
            ..Default::default()
        }
        .into_subcategory()
        .unwrap();
        db.create_service_subcategory(&mut sub).unwrap();
        (category, sub)
    }

    #[test]
    fn categories_include_subcategories() {
        let db = Database::open_in_memory().unwrap();
        let (category, sub) = seed_category(&db);
        let listed = db.list_service_categories(false).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].subcategories[0].id, sub.id);
        assert_eq!(listed[0].slug, "content-marketing");

        db.delete_service_category(category.id).unwrap();
        assert!(db.get_service_subcategory(sub.id).unwrap().is_none());
    }

    #[test]
    fn services_filter_by_category_slug() {
        let db = Database::open_in_memory().unwrap();
        let (category, sub) = seed_category(&db);
        let mut post = ServicePostInput {
            title: Some("Editorial Calendars".into()),
            content: Some("<p>Plan ahead</p>".into()),
            category_id: Some(category.id),
            subcategory_id: Some(sub.id),
            status: Some("published".into()),
            ..Default::default()
        }
        .into_post()
        .unwrap();
        db.create_service_post(&mut post).unwrap();

        let query = ServiceQuery {
            category: Some("content-marketing".into()),
            ..Default::default()
        };
        let (posts, total) = db.list_service_posts(&query).unwrap();
        assert_eq!(total, 1);
        assert_eq!(posts[0].category_name.as_deref(), Some("Content Marketing"));

        let query = ServiceQuery {
            subcategory: Some("nope".into()),
            ..Default::default()
        };
        assert_eq!(db.list_service_posts(&query).unwrap().1, 0);
    }

    #[test]
    fn unknown_category_reference_is_a_validation_error() {
        let db = Database::open_in_memory().unwrap();
        let mut sub = ServiceSubcategoryInput {
            category_id: Some(999),
            name: Some("Orphan".into()),
            ..Default::default()
        }
        .into_subcategory()
        .unwrap();
        assert!(matches!(db.create_service_subcategory(&mut sub), Err(CmsError::Validation(_))));
    }
}
