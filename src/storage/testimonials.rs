use super::{expect_changed, Database};
use crate::domain::Testimonial;
use crate::error::{CmsError, Result};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

const SELECT_TESTIMONIAL: &str = "SELECT t.id, t.name, t.role, t.company, t.content, t.image_url, t.rating, \
     t.display_order, t.is_active, t.created_at, t.updated_at FROM testimonials t";

fn row_to_testimonial(row: &Row<'_>) -> rusqlite::Result<Testimonial> {
    Ok(Testimonial {
        id: row.get(0)?,
        name: row.get(1)?,
        role: row.get(2)?,
        company: row.get(3)?,
        content: row.get(4)?,
        image_url: row.get(5)?,
        rating: row.get(6)?,
        display_order: row.get(7)?,
        is_active: row.get(8)?,
        service_ids: Vec::new(),
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn load_service_ids(conn: &Connection, testimonial: &mut Testimonial) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT service_id FROM testimonial_services WHERE testimonial_id = ?1 ORDER BY service_id",
    )?;
    testimonial.service_ids = stmt
        .query_map(params![testimonial.id], |r| r.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(())
}

/// Replaces the testimonial's service links inside the caller's transaction.
fn sync_service_ids(tx: &Transaction<'_>, testimonial: &Testimonial) -> Result<()> {
    tx.execute(
        "DELETE FROM testimonial_services WHERE testimonial_id = ?1",
        params![testimonial.id],
    )?;
    for service_id in &testimonial.service_ids {
        tx.execute(
            "INSERT OR IGNORE INTO testimonial_services (testimonial_id, service_id) VALUES (?1, ?2)",
            params![testimonial.id, service_id],
        )
        .map_err(|e| match CmsError::from(e) {
            e if e.is_foreign_key_violation() => {
                CmsError::validation(format!("service {service_id} does not exist"))
            }
            e => e,
        })?;
    }
    Ok(())
}

impl Database {
    pub fn create_testimonial(&self, testimonial: &mut Testimonial) -> Result<()> {
        testimonial.id = self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO testimonials (name, role, company, content, image_url, rating, display_order, \
                 is_active, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    testimonial.name,
                    testimonial.role,
                    testimonial.company,
                    testimonial.content,
                    testimonial.image_url,
                    testimonial.rating,
                    testimonial.display_order,
                    testimonial.is_active,
                    testimonial.created_at,
                    testimonial.updated_at,
                ],
            )?;
            let id = tx.last_insert_rowid();
            let mut saved = testimonial.clone();
            saved.id = id;
            sync_service_ids(tx, &saved)?;
            Ok(id)
        })?;
        Ok(())
    }

    pub fn get_testimonial(&self, id: i64) -> Result<Option<Testimonial>> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    &format!("{SELECT_TESTIMONIAL} WHERE t.id = ?1"),
                    params![id],
                    row_to_testimonial,
                )
                .optional()?;
            match found {
                Some(mut t) => {
                    load_service_ids(conn, &mut t)?;
                    Ok(Some(t))
                }
                None => Ok(None),
            }
        })
    }

    /// Testimonials in display order, optionally only those linked to `service_id`.
    pub fn list_testimonials(&self, service_id: Option<i64>, include_inactive: bool) -> Result<Vec<Testimonial>> {
        self.with_conn(|conn| {
            let mut clauses = Vec::new();
            if !include_inactive {
                clauses.push("t.is_active = 1");
            }
            if service_id.is_some() {
                clauses.push(
                    "EXISTS (SELECT 1 FROM testimonial_services ts WHERE ts.testimonial_id = t.id AND ts.service_id = ?1)",
                );
            }
            let where_sql = if clauses.is_empty() {
                String::new()
            } else {
                format!(" WHERE {}", clauses.join(" AND "))
            };
            let sql = format!("{SELECT_TESTIMONIAL}{where_sql} ORDER BY t.display_order, t.id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = match service_id {
                Some(id) => stmt.query_map(params![id], row_to_testimonial)?,
                None => stmt.query_map([], row_to_testimonial)?,
            };
            let mut testimonials = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            for t in testimonials.iter_mut() {
                load_service_ids(conn, t)?;
            }
            Ok(testimonials)
        })
    }

    pub fn update_testimonial(&self, testimonial: &Testimonial) -> Result<()> {
        self.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE testimonials SET name = ?1, role = ?2, company = ?3, content = ?4, image_url = ?5, \
                 rating = ?6, display_order = ?7, is_active = ?8, updated_at = ?9 WHERE id = ?10",
                params![
                    testimonial.name,
                    testimonial.role,
                    testimonial.company,
                    testimonial.content,
                    testimonial.image_url,
                    testimonial.rating,
                    testimonial.display_order,
                    testimonial.is_active,
                    testimonial.updated_at,
                    testimonial.id,
                ],
            )?;
            expect_changed(changed, "Testimonial")?;
            sync_service_ids(tx, testimonial)
        })
    }

    pub fn delete_testimonial(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM testimonials WHERE id = ?1", params![id])?;
            expect_changed(changed, "Testimonial")
        })
    }

    pub fn clear_testimonials(&self) -> Result<usize> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM testimonials", [])?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ServicePostInput, TestimonialInput};

    fn service(db: &Database, title: &str) -> i64 {
        let mut post = ServicePostInput {
            title: Some(title.into()),
            content: Some("body".into()),
            ..Default::default()
        }
        .into_post()
        .unwrap();
        db.create_service_post(&mut post).unwrap();
        post.id
    }

    fn testimonial(name: &str, service_ids: Vec<i64>) -> Testimonial {
        TestimonialInput {
            name: Some(name.into()),
            content: Some("Great work".into()),
            service_ids: Some(service_ids),
            ..Default::default()
        }
        .into_testimonial()
        .unwrap()
    }

    #[test]
    fn filters_by_linked_service() {
        let db = Database::open_in_memory().unwrap();
        let seo = service(&db, "SEO");
        let video = service(&db, "Video");
        db.create_testimonial(&mut testimonial("A", vec![seo])).unwrap();
        db.create_testimonial(&mut testimonial("B", vec![seo, video])).unwrap();
        db.create_testimonial(&mut testimonial("C", vec![])).unwrap();

        assert_eq!(db.list_testimonials(None, false).unwrap().len(), 3);
        let for_video = db.list_testimonials(Some(video), false).unwrap();
        assert_eq!(for_video.len(), 1);
        assert_eq!(for_video[0].name, "B");
        assert_eq!(for_video[0].service_ids, vec![seo, video]);
    }

    #[test]
    fn update_replaces_links_and_rejects_unknown_services() {
        let db = Database::open_in_memory().unwrap();
        let seo = service(&db, "SEO");
        let mut t = testimonial("A", vec![seo]);
        db.create_testimonial(&mut t).unwrap();

        t.service_ids = vec![];
        db.update_testimonial(&t).unwrap();
        assert!(db.get_testimonial(t.id).unwrap().unwrap().service_ids.is_empty());

        t.service_ids = vec![404];
        assert!(matches!(db.update_testimonial(&t), Err(CmsError::Validation(_))));
    }
}
