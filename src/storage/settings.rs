use super::Database;
use crate::domain::StoreSettings;
use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};

impl Database {
    /// The settings row, if one was ever saved.
    pub fn get_store_settings(&self) -> Result<Option<StoreSettings>> {
        self.with_conn(read_settings)
    }

    /// Merges `patch` into the stored row (creating it on first save) and
    /// returns the result.
    pub fn upsert_store_settings(&self, patch: StoreSettings) -> Result<StoreSettings> {
        self.with_tx(|tx| {
            let mut settings = read_settings(tx)?.unwrap_or_default();
            settings.apply(patch);
            tx.execute(
                "INSERT INTO store_settings (id, site_name, tagline, logo_url, favicon_url, contact_email, \
                 contact_phone, address, facebook_url, twitter_url, linkedin_url, instagram_url, meta_title, \
                 meta_description, footer_text, updated_at) \
                 VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15) \
                 ON CONFLICT(id) DO UPDATE SET site_name = excluded.site_name, tagline = excluded.tagline, \
                 logo_url = excluded.logo_url, favicon_url = excluded.favicon_url, \
                 contact_email = excluded.contact_email, contact_phone = excluded.contact_phone, \
                 address = excluded.address, facebook_url = excluded.facebook_url, \
                 twitter_url = excluded.twitter_url, linkedin_url = excluded.linkedin_url, \
                 instagram_url = excluded.instagram_url, meta_title = excluded.meta_title, \
                 meta_description = excluded.meta_description, footer_text = excluded.footer_text, \
                 updated_at = excluded.updated_at",
                params![
                    settings.site_name,
                    settings.tagline,
                    settings.logo_url,
                    settings.favicon_url,
                    settings.contact_email,
                    settings.contact_phone,
                    settings.address,
                    settings.facebook_url,
                    settings.twitter_url,
                    settings.linkedin_url,
                    settings.instagram_url,
                    settings.meta_title,
                    settings.meta_description,
                    settings.footer_text,
                    settings.updated_at,
                ],
            )?;
            Ok(settings)
        })
    }

    pub fn clear_store_settings(&self) -> Result<usize> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM store_settings", [])?))
    }
}

fn read_settings(conn: &Connection) -> Result<Option<StoreSettings>> {
    Ok(conn
        .query_row(
            "SELECT site_name, tagline, logo_url, favicon_url, contact_email, contact_phone, address, \
             facebook_url, twitter_url, linkedin_url, instagram_url, meta_title, meta_description, \
             footer_text, updated_at FROM store_settings WHERE id = 1",
            [],
            |row| {
                Ok(StoreSettings {
                    site_name: row.get(0)?,
                    tagline: row.get(1)?,
                    logo_url: row.get(2)?,
                    favicon_url: row.get(3)?,
                    contact_email: row.get(4)?,
                    contact_phone: row.get(5)?,
                    address: row.get(6)?,
                    facebook_url: row.get(7)?,
                    twitter_url: row.get(8)?,
                    linkedin_url: row.get(9)?,
                    instagram_url: row.get(10)?,
                    meta_title: row.get(11)?,
                    meta_description: row.get(12)?,
                    footer_text: row.get(13)?,
                    updated_at: row.get(14)?,
                })
            },
        )
        .optional()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_until_first_save_then_merged() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_store_settings().unwrap().is_none());

        db.upsert_store_settings(StoreSettings {
            site_name: Some("Inkwell".into()),
            contact_email: Some("hi@inkwell.test".into()),
            ..Default::default()
        })
        .unwrap();
        let saved = db
            .upsert_store_settings(StoreSettings {
                tagline: Some("Stories that sell".into()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(saved.site_name.as_deref(), Some("Inkwell"));
        let loaded = db.get_store_settings().unwrap().unwrap();
        assert_eq!(loaded.tagline.as_deref(), Some("Stories that sell"));
        assert_eq!(loaded.contact_email.as_deref(), Some("hi@inkwell.test"));
    }

    #[test]
    fn concurrent_partial_saves_keep_every_field() {
        let db = Database::open_in_memory().unwrap();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = db.clone();
                std::thread::spawn(move || {
                    let patch = if i % 2 == 0 {
                        StoreSettings { site_name: Some(format!("Inkwell {i}")), ..Default::default() }
                    } else {
                        StoreSettings { tagline: Some(format!("Tagline {i}")), ..Default::default() }
                    };
                    db.upsert_store_settings(patch).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let loaded = db.get_store_settings().unwrap().unwrap();
        assert!(loaded.site_name.is_some());
        assert!(loaded.tagline.is_some());
    }
}
