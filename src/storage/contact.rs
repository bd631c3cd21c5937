use super::{expect_changed, Database};
use crate::domain::ContactSubmission;
use crate::error::Result;
use rusqlite::{params, OptionalExtension, Row};

const SELECT_SUBMISSION: &str = "SELECT id, name, email, phone, company, service, message, is_read, created_at \
     FROM contact_submissions";

fn row_to_submission(row: &Row<'_>) -> rusqlite::Result<ContactSubmission> {
    Ok(ContactSubmission {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        company: row.get(4)?,
        service: row.get(5)?,
        message: row.get(6)?,
        is_read: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl Database {
    pub fn create_contact_submission(&self, sub: &mut ContactSubmission) -> Result<()> {
        sub.id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO contact_submissions (name, email, phone, company, service, message, is_read, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    sub.name,
                    sub.email,
                    sub.phone,
                    sub.company,
                    sub.service,
                    sub.message,
                    sub.is_read,
                    sub.created_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        Ok(())
    }

    pub fn get_contact_submission(&self, id: i64) -> Result<Option<ContactSubmission>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("{SELECT_SUBMISSION} WHERE id = ?1"),
                    params![id],
                    row_to_submission,
                )
                .optional()?)
        })
    }

    /// Newest first. `unread_only` hides submissions already marked read.
    pub fn list_contact_submissions(&self, unread_only: bool) -> Result<Vec<ContactSubmission>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{SELECT_SUBMISSION}{} ORDER BY created_at DESC, id DESC",
                if unread_only { " WHERE is_read = 0" } else { "" }
            );
            let mut stmt = conn.prepare(&sql)?;
            let subs = stmt
                .query_map([], row_to_submission)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(subs)
        })
    }

    pub fn set_contact_read(&self, id: i64, is_read: bool) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE contact_submissions SET is_read = ?1 WHERE id = ?2",
                params![is_read, id],
            )?;
            expect_changed(changed, "Contact submission")
        })
    }

    pub fn delete_contact_submission(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM contact_submissions WHERE id = ?1", params![id])?;
            expect_changed(changed, "Contact submission")
        })
    }

    pub fn count_unread_contact_submissions(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM contact_submissions WHERE is_read = 0",
                [],
                |r| r.get(0),
            )?;
            Ok(n as usize)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ContactInput;

    #[test]
    fn submissions_can_be_marked_read() {
        let db = Database::open_in_memory().unwrap();
        let mut sub = ContactInput {
            name: Some("Sam".into()),
            email: Some("sam@example.com".into()),
            message: Some("Hello".into()),
            ..Default::default()
        }
        .into_submission()
        .unwrap();
        db.create_contact_submission(&mut sub).unwrap();
        assert_eq!(db.count_unread_contact_submissions().unwrap(), 1);

        db.set_contact_read(sub.id, true).unwrap();
        assert!(db.list_contact_submissions(true).unwrap().is_empty());
        assert_eq!(db.list_contact_submissions(false).unwrap().len(), 1);
        assert!(db.get_contact_submission(sub.id).unwrap().unwrap().is_read);
    }
}
