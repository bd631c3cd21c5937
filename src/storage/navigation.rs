use super::{conflict_on_unique, expect_changed, Database};
use crate::domain::{FooterLink, FooterSection, NavbarItem};
use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

const SELECT_NAVBAR: &str = "SELECT id, label, href, parent_id, display_order, is_active, open_in_new_tab, \
     created_at, updated_at FROM navbar_items";

const SELECT_SECTION: &str =
    "SELECT id, title, display_order, is_active, created_at, updated_at FROM footer_sections";

const SELECT_LINK: &str = "SELECT id, section_id, label, href, display_order, is_active, created_at, updated_at \
     FROM footer_links";

fn row_to_navbar(row: &Row<'_>) -> rusqlite::Result<NavbarItem> {
    Ok(NavbarItem {
        id: row.get(0)?,
        label: row.get(1)?,
        href: row.get(2)?,
        parent_id: row.get(3)?,
        display_order: row.get(4)?,
        is_active: row.get(5)?,
        open_in_new_tab: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn row_to_section(row: &Row<'_>) -> rusqlite::Result<FooterSection> {
    Ok(FooterSection {
        id: row.get(0)?,
        title: row.get(1)?,
        display_order: row.get(2)?,
        is_active: row.get(3)?,
        links: Vec::new(),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn row_to_link(row: &Row<'_>) -> rusqlite::Result<FooterLink> {
    Ok(FooterLink {
        id: row.get(0)?,
        section_id: row.get(1)?,
        label: row.get(2)?,
        href: row.get(3)?,
        display_order: row.get(4)?,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn links_of(conn: &Connection, section_id: i64, include_inactive: bool) -> Result<Vec<FooterLink>> {
    let sql = format!(
        "{SELECT_LINK} WHERE section_id = ?1{} ORDER BY display_order, id",
        if include_inactive { "" } else { " AND is_active = 1" }
    );
    let mut stmt = conn.prepare(&sql)?;
    let links = stmt
        .query_map(params![section_id], row_to_link)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(links)
}

fn missing_parent() -> String {
    "parent navbar item does not exist".to_string()
}

impl Database {
    // Navbar

    pub fn create_navbar_item(&self, item: &mut NavbarItem) -> Result<()> {
        item.id = conflict_on_unique(
            self.with_conn(|conn| {
                conn.execute(
                    "INSERT INTO navbar_items (label, href, parent_id, display_order, is_active, open_in_new_tab, \
                     created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        item.label,
                        item.href,
                        item.parent_id,
                        item.display_order,
                        item.is_active,
                        item.open_in_new_tab,
                        item.created_at,
                        item.updated_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            }),
            missing_parent,
        )?;
        Ok(())
    }

    pub fn get_navbar_item(&self, id: i64) -> Result<Option<NavbarItem>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(&format!("{SELECT_NAVBAR} WHERE id = ?1"), params![id], row_to_navbar)
                .optional()?)
        })
    }

    /// Flat list in display order.
    pub fn list_navbar_items(&self, include_inactive: bool) -> Result<Vec<NavbarItem>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{SELECT_NAVBAR}{} ORDER BY display_order, id",
                if include_inactive { "" } else { " WHERE is_active = 1" }
            );
            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map([], row_to_navbar)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(items)
        })
    }

    pub fn update_navbar_item(&self, item: &NavbarItem) -> Result<()> {
        conflict_on_unique(
            self.with_conn(|conn| {
                let changed = conn.execute(
                    "UPDATE navbar_items SET label = ?1, href = ?2, parent_id = ?3, display_order = ?4, \
                     is_active = ?5, open_in_new_tab = ?6, updated_at = ?7 WHERE id = ?8",
                    params![
                        item.label,
                        item.href,
                        item.parent_id,
                        item.display_order,
                        item.is_active,
                        item.open_in_new_tab,
                        item.updated_at,
                        item.id,
                    ],
                )?;
                expect_changed(changed, "Navbar item")
            }),
            missing_parent,
        )
    }

    /// Deletes the item; children go with it.
    pub fn delete_navbar_item(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM navbar_items WHERE id = ?1", params![id])?;
            expect_changed(changed, "Navbar item")
        })
    }

    pub fn clear_navbar(&self) -> Result<usize> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM navbar_items", [])?))
    }

    // Footer

    pub fn create_footer_section(&self, section: &mut FooterSection) -> Result<()> {
        section.id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO footer_sections (title, display_order, is_active, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    section.title,
                    section.display_order,
                    section.is_active,
                    section.created_at,
                    section.updated_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        Ok(())
    }

    pub fn get_footer_section(&self, id: i64) -> Result<Option<FooterSection>> {
        self.with_conn(|conn| {
            let section = conn
                .query_row(&format!("{SELECT_SECTION} WHERE id = ?1"), params![id], row_to_section)
                .optional()?;
            match section {
                Some(mut s) => {
                    s.links = links_of(conn, s.id, true)?;
                    Ok(Some(s))
                }
                None => Ok(None),
            }
        })
    }

    /// Sections in display order with their links nested.
    pub fn list_footer_sections(&self, include_inactive: bool) -> Result<Vec<FooterSection>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{SELECT_SECTION}{} ORDER BY display_order, id",
                if include_inactive { "" } else { " WHERE is_active = 1" }
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut sections = stmt
                .query_map([], row_to_section)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for section in sections.iter_mut() {
                section.links = links_of(conn, section.id, include_inactive)?;
            }
            Ok(sections)
        })
    }

    pub fn update_footer_section(&self, section: &FooterSection) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE footer_sections SET title = ?1, display_order = ?2, is_active = ?3, updated_at = ?4 \
                 WHERE id = ?5",
                params![
                    section.title,
                    section.display_order,
                    section.is_active,
                    section.updated_at,
                    section.id,
                ],
            )?;
            expect_changed(changed, "Footer section")
        })
    }

    pub fn delete_footer_section(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM footer_sections WHERE id = ?1", params![id])?;
            expect_changed(changed, "Footer section")
        })
    }

    pub fn create_footer_link(&self, link: &mut FooterLink) -> Result<()> {
        link.id = conflict_on_unique(
            self.with_conn(|conn| {
                conn.execute(
                    "INSERT INTO footer_links (section_id, label, href, display_order, is_active, created_at, \
                     updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        link.section_id,
                        link.label,
                        link.href,
                        link.display_order,
                        link.is_active,
                        link.created_at,
                        link.updated_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            }),
            || "footer section does not exist".to_string(),
        )?;
        Ok(())
    }

    pub fn get_footer_link(&self, id: i64) -> Result<Option<FooterLink>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(&format!("{SELECT_LINK} WHERE id = ?1"), params![id], row_to_link)
                .optional()?)
        })
    }

    pub fn list_footer_links(&self, section_id: i64) -> Result<Vec<FooterLink>> {
        self.with_conn(|conn| links_of(conn, section_id, true))
    }

    pub fn update_footer_link(&self, link: &FooterLink) -> Result<()> {
        conflict_on_unique(
            self.with_conn(|conn| {
                let changed = conn.execute(
                    "UPDATE footer_links SET section_id = ?1, label = ?2, href = ?3, display_order = ?4, \
                     is_active = ?5, updated_at = ?6 WHERE id = ?7",
                    params![
                        link.section_id,
                        link.label,
                        link.href,
                        link.display_order,
                        link.is_active,
                        link.updated_at,
                        link.id,
                    ],
                )?;
                expect_changed(changed, "Footer link")
            }),
            || "footer section does not exist".to_string(),
        )
    }

    pub fn delete_footer_link(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM footer_links WHERE id = ?1", params![id])?;
            expect_changed(changed, "Footer link")
        })
    }

    pub fn clear_footer(&self) -> Result<usize> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM footer_sections", [])?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{build_navbar_tree, FooterLinkInput, FooterSectionInput, NavbarItemInput};
    use crate::error::CmsError;

    fn nav(db: &Database, label: &str, parent_id: Option<i64>, order: i64) -> NavbarItem {
        let mut item = NavbarItemInput {
            label: Some(label.into()),
            href: Some(format!("/{}", label.to_lowercase())),
            parent_id,
            display_order: Some(order),
            ..Default::default()
        }
        .into_item()
        .unwrap();
        db.create_navbar_item(&mut item).unwrap();
        item
    }

    #[test]
    fn navbar_children_follow_parent_deletion() {
        let db = Database::open_in_memory().unwrap();
        let services = nav(&db, "Services", None, 2);
        let home = nav(&db, "Home", None, 1);
        nav(&db, "SEO", Some(services.id), 1);

        let tree = build_navbar_tree(&db.list_navbar_items(false).unwrap());
        assert_eq!(tree[0].item.id, home.id);
        assert_eq!(tree[1].children.len(), 1);

        db.delete_navbar_item(services.id).unwrap();
        assert_eq!(db.list_navbar_items(true).unwrap().len(), 1);
    }

    #[test]
    fn navbar_rejects_missing_parent() {
        let db = Database::open_in_memory().unwrap();
        let mut item = NavbarItemInput {
            label: Some("Lost".into()),
            href: Some("/lost".into()),
            parent_id: Some(77),
            ..Default::default()
        }
        .into_item()
        .unwrap();
        assert!(matches!(db.create_navbar_item(&mut item), Err(CmsError::Validation(_))));
    }

    #[test]
    fn footer_sections_nest_links() {
        let db = Database::open_in_memory().unwrap();
        let mut section = FooterSectionInput {
            title: Some("Company".into()),
            ..Default::default()
        }
        .into_section()
        .unwrap();
        db.create_footer_section(&mut section).unwrap();
        for (i, label) in ["About", "Careers"].iter().enumerate() {
            let mut link = FooterLinkInput {
                label: Some(label.to_string()),
                href: Some(format!("/{}", label.to_lowercase())),
                display_order: Some(i as i64),
                ..Default::default()
            }
            .into_link(section.id)
            .unwrap();
            db.create_footer_link(&mut link).unwrap();
        }

        let sections = db.list_footer_sections(false).unwrap();
        assert_eq!(sections[0].links.len(), 2);
        assert_eq!(sections[0].links[0].label, "About");

        db.delete_footer_section(section.id).unwrap();
        assert!(db.list_footer_links(section.id).unwrap().is_empty());
    }
}
