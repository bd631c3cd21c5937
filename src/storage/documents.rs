//! Page sections as JSON documents grouped into named collections
//! (`<page>.<section>`). Field shape is owned by [`crate::sections`]; this
//! layer only stores and orders the payloads.

use super::{expect_changed, Database};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDocument {
    pub id: i64,
    #[serde(skip)]
    pub collection: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
    pub is_active: bool,
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SectionDocument {
    pub fn new(collection: &str, data: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            collection: collection.to_string(),
            data,
            is_active: true,
            display_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// String field, empty when missing or not a string.
    pub fn text(&self, field: &str) -> &str {
        self.data.get(field).and_then(Value::as_str).unwrap_or("")
    }

    /// Any scalar field rendered for display; lists and objects come out empty.
    pub fn display(&self, field: &str) -> String {
        match self.data.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    pub fn has(&self, field: &str) -> bool {
        match self.data.get(field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        }
    }

    /// List field as strings; non-string entries are rendered as JSON.
    pub fn list(&self, field: &str) -> Vec<String> {
        match self.data.get(field) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

const SELECT_DOCUMENT: &str =
    "SELECT id, collection, data, is_active, display_order, created_at, updated_at FROM documents";

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<SectionDocument> {
    let raw: String = row.get(2)?;
    let data = serde_json::from_str::<Map<String, Value>>(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(SectionDocument {
        id: row.get(0)?,
        collection: row.get(1)?,
        data,
        is_active: row.get(3)?,
        display_order: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn deactivate_others(tx: &Transaction<'_>, collection: &str, keep_id: i64) -> Result<()> {
    tx.execute(
        "UPDATE documents SET is_active = 0 WHERE collection = ?1 AND id != ?2 AND is_active = 1",
        params![collection, keep_id],
    )?;
    Ok(())
}

impl Database {
    /// Documents of a collection in display order.
    pub fn list_documents(&self, collection: &str, include_inactive: bool) -> Result<Vec<SectionDocument>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{SELECT_DOCUMENT} WHERE collection = ?1{} ORDER BY display_order, id",
                if include_inactive { "" } else { " AND is_active = 1" }
            );
            let mut stmt = conn.prepare(&sql)?;
            let docs = stmt
                .query_map(params![collection], row_to_document)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(docs)
        })
    }

    pub fn get_document(&self, collection: &str, id: i64) -> Result<Option<SectionDocument>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("{SELECT_DOCUMENT} WHERE collection = ?1 AND id = ?2"),
                    params![collection, id],
                    row_to_document,
                )
                .optional()?)
        })
    }

    /// The active document of a singleton collection, most recently updated first.
    pub fn active_document(&self, collection: &str) -> Result<Option<SectionDocument>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "{SELECT_DOCUMENT} WHERE collection = ?1 AND is_active = 1 \
                         ORDER BY updated_at DESC, id DESC LIMIT 1"
                    ),
                    params![collection],
                    row_to_document,
                )
                .optional()?)
        })
    }

    /// Inserts `doc`. For singleton collections an active insert deactivates
    /// every other document in the same transaction.
    pub fn insert_document(&self, doc: &mut SectionDocument, singleton: bool) -> Result<()> {
        let raw = serde_json::to_string(&doc.data)?;
        doc.id = self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO documents (collection, data, is_active, display_order, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    doc.collection,
                    raw,
                    doc.is_active,
                    doc.display_order,
                    doc.created_at,
                    doc.updated_at,
                ],
            )?;
            let id = tx.last_insert_rowid();
            if singleton && doc.is_active {
                deactivate_others(tx, &doc.collection, id)?;
            }
            Ok(id)
        })?;
        Ok(())
    }

    pub fn update_document(&self, doc: &SectionDocument, singleton: bool) -> Result<()> {
        let raw = serde_json::to_string(&doc.data)?;
        self.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE documents SET data = ?1, is_active = ?2, display_order = ?3, updated_at = ?4 \
                 WHERE collection = ?5 AND id = ?6",
                params![
                    raw,
                    doc.is_active,
                    doc.display_order,
                    doc.updated_at,
                    doc.collection,
                    doc.id,
                ],
            )?;
            expect_changed(changed, "Section item")?;
            if singleton && doc.is_active {
                deactivate_others(tx, &doc.collection, doc.id)?;
            }
            Ok(())
        })
    }

    pub fn delete_document(&self, collection: &str, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )?;
            expect_changed(changed, "Section item")
        })
    }

    pub fn clear_collection(&self, collection: &str) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM documents WHERE collection = ?1", params![collection])?)
        })
    }

    pub fn count_documents(&self, collection: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                params![collection],
                |r| r.get(0),
            )?;
            Ok(n as usize)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CmsError;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn singleton_insert_deactivates_previous() {
        let db = Database::open_in_memory().unwrap();
        let mut first = SectionDocument::new("home.hero", data(json!({"title": "First"})));
        db.insert_document(&mut first, true).unwrap();
        let mut second = SectionDocument::new("home.hero", data(json!({"title": "Second"})));
        db.insert_document(&mut second, true).unwrap();

        let active = db.list_documents("home.hero", false).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].text("title"), "Second");
        assert_eq!(db.active_document("home.hero").unwrap().unwrap().id, second.id);
        assert_eq!(db.count_documents("home.hero").unwrap(), 2);
    }

    #[test]
    fn collections_are_isolated_and_ordered() {
        let db = Database::open_in_memory().unwrap();
        for (order, label) in [(2, "Clients"), (1, "Articles")] {
            let mut doc = SectionDocument::new("home.stats", data(json!({"label": label, "value": "10"})));
            doc.display_order = order;
            db.insert_document(&mut doc, false).unwrap();
        }
        let stats = db.list_documents("home.stats", false).unwrap();
        assert_eq!(stats[0].text("label"), "Articles");
        assert!(db.get_document("about.team", stats[0].id).unwrap().is_none());
        assert!(matches!(
            db.delete_document("about.team", stats[0].id),
            Err(CmsError::NotFound(_))
        ));
    }

    #[test]
    fn serializes_payload_fields_flat() {
        let doc = SectionDocument::new("faq.items", data(json!({"question": "Why?", "answer": "Because"})));
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["question"], "Why?");
        assert_eq!(json["is_active"], true);
        assert!(json.get("collection").is_none());
        assert!(doc.has("answer"));
        assert!(!doc.has("category"));
    }

    #[test]
    fn cached_json_reads_back_with_payload() {
        let doc = SectionDocument::new(
            "services.process",
            data(json!({"title": "Discover", "step_number": 1})),
        );
        let back: SectionDocument = serde_json::from_value(serde_json::to_value(&doc).unwrap()).unwrap();
        assert_eq!(back.text("title"), "Discover");
        assert_eq!(back.display("step_number"), "1");
        assert_eq!(back.data.len(), 2);
        assert!(back.is_active);
    }
}
