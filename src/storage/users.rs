use super::{conflict_on_unique, expect_changed, Database};
use crate::domain::{Role, User};
use crate::error::Result;
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

const SELECT_USER: &str =
    "SELECT id, name, email, password_hash, role, is_active, created_at, updated_at FROM users";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: Role::parse(&role).unwrap_or(Role::Editor),
        is_active: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl Database {
    /// Inserts a user whose `password_hash` is already set.
    pub fn create_user(&self, user: &mut User) -> Result<()> {
        let email = user.email.clone();
        user.id = conflict_on_unique(
            self.with_conn(|conn| {
                conn.execute(
                    "INSERT INTO users (name, email, password_hash, role, is_active, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        user.name,
                        user.email,
                        user.password_hash,
                        user.role.as_str(),
                        user.is_active,
                        user.created_at,
                        user.updated_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            }),
            || format!("A user with email '{email}' already exists"),
        )?;
        info!("Created user {} ({})", user.email, user.role.as_str());
        Ok(())
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(&format!("{SELECT_USER} WHERE id = ?1"), params![id], row_to_user)
                .optional()?)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("{SELECT_USER} WHERE email = ?1"),
                    params![email.trim()],
                    row_to_user,
                )
                .optional()?)
        })
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_USER} ORDER BY id"))?;
            let users = stmt
                .query_map([], row_to_user)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
    }

    pub fn update_user(&self, user: &User) -> Result<()> {
        let email = user.email.clone();
        conflict_on_unique(
            self.with_conn(|conn| {
                let changed = conn.execute(
                    "UPDATE users SET name = ?1, email = ?2, password_hash = ?3, role = ?4, is_active = ?5, \
                     updated_at = ?6 WHERE id = ?7",
                    params![
                        user.name,
                        user.email,
                        user.password_hash,
                        user.role.as_str(),
                        user.is_active,
                        user.updated_at,
                        user.id,
                    ],
                )?;
                expect_changed(changed, "User")
            }),
            || format!("A user with email '{email}' already exists"),
        )
    }

    pub fn delete_user(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
            expect_changed(changed, "User")
        })
    }

    pub fn count_users(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
            Ok(n as usize)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserInput;
    use crate::error::CmsError;

    fn user(email: &str) -> User {
        let (mut user, _) = UserInput {
            name: Some("Editor".into()),
            email: Some(email.into()),
            password: Some("long enough".into()),
            ..Default::default()
        }
        .into_user()
        .unwrap();
        user.password_hash = "hash".into();
        user
    }

    #[test]
    fn email_is_unique_case_insensitively() {
        let db = Database::open_in_memory().unwrap();
        let mut first = user("ed@example.com");
        db.create_user(&mut first).unwrap();
        let mut second = user("ed@example.com");
        second.email = "ED@example.com".into();
        assert!(matches!(db.create_user(&mut second), Err(CmsError::Conflict(_))));
        assert_eq!(db.get_user_by_email("ED@EXAMPLE.COM").unwrap().unwrap().id, first.id);
    }

    #[test]
    fn update_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let mut u = user("a@example.com");
        db.create_user(&mut u).unwrap();
        u.role = Role::Admin;
        db.update_user(&u).unwrap();
        assert_eq!(db.get_user(u.id).unwrap().unwrap().role, Role::Admin);
        assert_eq!(db.count_users().unwrap(), 1);
        db.delete_user(u.id).unwrap();
        assert!(db.get_user(u.id).unwrap().is_none());
    }
}
