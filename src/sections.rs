//! Registry of editable page sections.
//!
//! Each section is a named block of a public page stored in the document
//! collection `<page>.<section>`. The registry owns the field list so the API,
//! the admin editor and the seeder agree on one shape.

use crate::constants::section_tag;
use crate::error::{CmsError, Result};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    /// At most one active document.
    Singleton,
    /// Ordered list of documents.
    Collection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    LongText,
    Url,
    Number,
    Bool,
    List,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SectionDef {
    pub page: &'static str,
    pub section: &'static str,
    pub kind: SectionKind,
    pub fields: &'static [FieldDef],
}

const fn req(name: &'static str, kind: FieldKind) -> FieldDef {
    FieldDef { name, kind, required: true }
}

const fn opt(name: &'static str, kind: FieldKind) -> FieldDef {
    FieldDef { name, kind, required: false }
}

use FieldKind::{Bool, List, LongText, Number, Text, Url};
use SectionKind::{Collection, Singleton};

const CTA_FIELDS: &[FieldDef] = &[
    req("title", Text),
    opt("description", LongText),
    opt("button_text", Text),
    opt("button_link", Url),
];

const SIMPLE_HERO_FIELDS: &[FieldDef] = &[
    req("title", Text),
    opt("subtitle", Text),
    opt("description", LongText),
    opt("image_url", Url),
];

pub static SECTIONS: &[SectionDef] = &[
    SectionDef {
        page: "home",
        section: "hero",
        kind: Singleton,
        fields: &[
            req("title", Text),
            opt("subtitle", Text),
            opt("description", LongText),
            opt("primary_button_text", Text),
            opt("primary_button_link", Url),
            opt("secondary_button_text", Text),
            opt("secondary_button_link", Url),
            opt("image_url", Url),
        ],
    },
    SectionDef {
        page: "home",
        section: "journey",
        kind: Singleton,
        fields: &[
            req("title", Text),
            opt("subtitle", Text),
            opt("description", LongText),
            opt("steps", List),
            opt("image_url", Url),
        ],
    },
    SectionDef {
        page: "home",
        section: "stats",
        kind: Collection,
        fields: &[
            req("value", Text),
            req("label", Text),
            opt("suffix", Text),
            opt("description", Text),
        ],
    },
    SectionDef {
        page: "home",
        section: "features",
        kind: Collection,
        fields: &[
            req("title", Text),
            opt("description", LongText),
            opt("icon", Text),
            opt("link", Url),
        ],
    },
    SectionDef { page: "home", section: "cta", kind: Singleton, fields: CTA_FIELDS },
    SectionDef { page: "about", section: "hero", kind: Singleton, fields: SIMPLE_HERO_FIELDS },
    SectionDef {
        page: "about",
        section: "journey",
        kind: Singleton,
        fields: &[
            req("title", Text),
            opt("story", LongText),
            opt("founded_year", Number),
            opt("image_url", Url),
        ],
    },
    SectionDef {
        page: "about",
        section: "philosophy",
        kind: Singleton,
        fields: &[
            req("title", Text),
            opt("description", LongText),
            opt("quote", LongText),
            opt("quote_author", Text),
        ],
    },
    SectionDef {
        page: "about",
        section: "principles",
        kind: Collection,
        fields: &[req("title", Text), opt("description", LongText), opt("icon", Text)],
    },
    SectionDef {
        page: "about",
        section: "team",
        kind: Collection,
        fields: &[
            req("name", Text),
            req("role", Text),
            opt("bio", LongText),
            opt("image_url", Url),
            opt("linkedin_url", Url),
        ],
    },
    SectionDef { page: "about", section: "cta", kind: Singleton, fields: CTA_FIELDS },
    SectionDef { page: "services", section: "hero", kind: Singleton, fields: SIMPLE_HERO_FIELDS },
    SectionDef {
        page: "services",
        section: "process",
        kind: Collection,
        fields: &[req("title", Text), opt("step_number", Number), opt("description", LongText)],
    },
    SectionDef {
        page: "services",
        section: "features",
        kind: Collection,
        fields: &[req("title", Text), opt("description", LongText), opt("icon", Text)],
    },
    SectionDef { page: "services", section: "cta", kind: Singleton, fields: CTA_FIELDS },
    SectionDef {
        page: "contact",
        section: "hero",
        kind: Singleton,
        fields: &[req("title", Text), opt("subtitle", Text), opt("description", LongText)],
    },
    SectionDef {
        page: "contact",
        section: "info",
        kind: Singleton,
        fields: &[
            req("email", Text),
            opt("phone", Text),
            opt("address", LongText),
            opt("hours", Text),
            opt("map_url", Url),
        ],
    },
    SectionDef {
        page: "contact",
        section: "form",
        kind: Singleton,
        fields: &[
            req("title", Text),
            opt("description", LongText),
            opt("submit_text", Text),
            opt("success_message", Text),
        ],
    },
    SectionDef {
        page: "faq",
        section: "hero",
        kind: Singleton,
        fields: &[req("title", Text), opt("subtitle", Text), opt("description", LongText)],
    },
    SectionDef {
        page: "faq",
        section: "items",
        kind: Collection,
        fields: &[req("question", Text), req("answer", LongText), opt("category", Text)],
    },
    SectionDef {
        page: "terms",
        section: "hero",
        kind: Singleton,
        fields: &[req("title", Text), opt("subtitle", Text), opt("last_updated", Text)],
    },
    SectionDef {
        page: "terms",
        section: "sections",
        kind: Collection,
        fields: &[req("title", Text), req("content", LongText)],
    },
    SectionDef {
        page: "site",
        section: "seo",
        kind: Singleton,
        fields: &[opt("robots_txt", LongText), opt("sitemap_exclude", List), opt("noindex", Bool)],
    },
];

pub fn lookup(page: &str, section: &str) -> Option<&'static SectionDef> {
    SECTIONS.iter().find(|d| d.page == page && d.section == section)
}

/// Looks up `<page>.<section>`.
pub fn lookup_key(key: &str) -> Option<&'static SectionDef> {
    let (page, section) = key.split_once('.')?;
    lookup(page, section)
}

/// Field values plus the visibility/ordering meta fields of one request body.
#[derive(Debug, Default)]
pub struct SectionPayload {
    /// Normalized fields. `Null` marks an optional field the caller cleared.
    pub data: Map<String, Value>,
    pub is_active: Option<bool>,
    pub display_order: Option<i64>,
}

impl SectionPayload {
    /// Merges into an existing document's data: `Null` removes, anything else replaces.
    pub fn merge_into(self, target: &mut Map<String, Value>) {
        for (key, value) in self.data {
            if value.is_null() {
                target.remove(&key);
            } else {
                target.insert(key, value);
            }
        }
    }

    /// Data for a new document, without cleared markers.
    pub fn into_data(self) -> Map<String, Value> {
        self.data.into_iter().filter(|(_, v)| !v.is_null()).collect()
    }
}

impl SectionDef {
    pub fn collection(&self) -> String {
        format!("{}.{}", self.page, self.section)
    }

    pub fn tag(&self) -> String {
        section_tag(self.page, self.section)
    }

    pub fn is_singleton(&self) -> bool {
        self.kind == SectionKind::Singleton
    }

    pub fn title(&self) -> String {
        format!("{} / {}", humanize(self.page), humanize(self.section))
    }

    /// Validates a request body. With `partial`, required fields may be absent
    /// but not blank. Unknown keys are dropped.
    pub fn normalize(&self, body: &Value, partial: bool) -> Result<SectionPayload> {
        let object = body
            .as_object()
            .ok_or_else(|| CmsError::validation("request body must be a JSON object"))?;

        let mut payload = SectionPayload {
            is_active: match object.get("is_active") {
                None | Some(Value::Null) => None,
                Some(v) => Some(coerce_bool(v, "is_active")?),
            },
            display_order: match object.get("display_order") {
                None | Some(Value::Null) => None,
                Some(v) => Some(coerce_number(v, "display_order")?.round() as i64),
            },
            ..Default::default()
        };

        for field in self.fields {
            let value = match object.get(field.name) {
                Some(v) => normalize_field(field, v)?,
                None if partial => continue,
                None => Value::Null,
            };
            if value.is_null() && field.required {
                return Err(CmsError::validation(format!("{} is required", field.name)));
            }
            payload.data.insert(field.name.to_string(), value);
        }
        Ok(payload)
    }
}

pub fn humanize(name: &str) -> String {
    let spaced = name.replace(['_', '-'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn mismatch(field: &str, expected: &str) -> CmsError {
    CmsError::validation(format!("{field} must be {expected}"))
}

fn coerce_bool(value: &Value, field: &str) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "on" | "1" | "yes" => Ok(true),
            "false" | "off" | "0" | "no" | "" => Ok(false),
            _ => Err(mismatch(field, "a boolean")),
        },
        _ => Err(mismatch(field, "a boolean")),
    }
}

fn coerce_number(value: &Value, field: &str) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| mismatch(field, "a number")),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| mismatch(field, "a number")),
        _ => Err(mismatch(field, "a number")),
    }
}

fn is_link(value: &str) -> bool {
    ["/", "#", "http://", "https://", "mailto:", "tel:"]
        .iter()
        .any(|prefix| value.starts_with(prefix))
}

/// One field's value in stored form; `Null` when blank.
fn normalize_field(field: &FieldDef, value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let name = field.name;
    match field.kind {
        Text | LongText | Url => {
            let text = match value {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => return Err(mismatch(name, "a string")),
            };
            if text.is_empty() {
                return Ok(Value::Null);
            }
            if field.kind == Url && !is_link(&text) {
                return Err(mismatch(name, "an absolute URL or a site path"));
            }
            Ok(Value::String(text))
        }
        Number => {
            if matches!(value, Value::String(s) if s.trim().is_empty()) {
                return Ok(Value::Null);
            }
            let n = coerce_number(value, name)?;
            if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                Ok(Value::from(n as i64))
            } else {
                Ok(Value::from(n))
            }
        }
        Bool => Ok(Value::Bool(coerce_bool(value, name)?)),
        List => {
            let items: Vec<String> = match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => Ok(s.trim().to_string()),
                        Value::Number(n) => Ok(n.to_string()),
                        _ => Err(mismatch(name, "a list of strings")),
                    })
                    .collect::<Result<_>>()?,
                Value::String(s) => s.lines().map(|l| l.trim().to_string()).collect(),
                _ => return Err(mismatch(name, "a list of strings")),
            };
            let items: Vec<Value> = items
                .into_iter()
                .filter(|s| !s.is_empty())
                .map(Value::String)
                .collect();
            if items.is_empty() {
                Ok(Value::Null)
            } else {
                Ok(Value::Array(items))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registry_keys_are_unique() {
        let mut keys: Vec<String> = SECTIONS.iter().map(|d| d.collection()).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total);
        assert!(lookup("home", "hero").unwrap().is_singleton());
        assert_eq!(lookup_key("faq.items").unwrap().kind, SectionKind::Collection);
        assert!(lookup("home", "pricing").is_none());
    }

    #[test]
    fn create_requires_fields_and_drops_unknown_keys() {
        let def = lookup("about", "team").unwrap();
        let err = def.normalize(&json!({"name": "Ana"}), false).unwrap_err();
        assert_eq!(err.to_string(), "role is required");

        let payload = def
            .normalize(&json!({"name": " Ana ", "role": "Editor", "shoe_size": 9, "display_order": "2"}), false)
            .unwrap();
        assert_eq!(payload.display_order, Some(2));
        let data = payload.into_data();
        assert_eq!(data["name"], "Ana");
        assert!(!data.contains_key("shoe_size"));
        assert!(!data.contains_key("bio"));
    }

    #[test]
    fn partial_update_skips_absent_but_rejects_blank_required() {
        let def = lookup("home", "hero").unwrap();
        let payload = def.normalize(&json!({"subtitle": "New"}), true).unwrap();
        assert_eq!(payload.data.len(), 1);
        assert!(def.normalize(&json!({"title": "  "}), true).is_err());

        let mut existing = json!({"title": "Hi", "subtitle": "Old", "image_url": "/a.png"})
            .as_object()
            .cloned()
            .unwrap();
        def.normalize(&json!({"image_url": ""}), true)
            .unwrap()
            .merge_into(&mut existing);
        assert!(!existing.contains_key("image_url"));
        assert_eq!(existing["subtitle"], "Old");
    }

    #[test]
    fn field_kinds_are_checked() {
        let journey = lookup("about", "journey").unwrap();
        let payload = journey
            .normalize(&json!({"title": "Our story", "founded_year": "2015"}), false)
            .unwrap();
        assert_eq!(payload.data["founded_year"], 2015);
        assert!(journey.normalize(&json!({"title": "x", "founded_year": "soon"}), false).is_err());
        assert!(journey.normalize(&json!({"title": "x", "image_url": "javascript:alert(1)"}), false).is_err());
        assert!(journey.normalize(&json!({"title": ["x"]}), false).is_err());

        let seo = lookup("site", "seo").unwrap();
        let payload = seo
            .normalize(&json!({"sitemap_exclude": "/terms\n\n /faq "}), false)
            .unwrap();
        assert_eq!(payload.data["sitemap_exclude"], json!(["/terms", "/faq"]));
        assert!(seo.normalize(&json!([1, 2]), false).is_err());
    }

    #[test]
    fn humanize_names() {
        assert_eq!(humanize("primary_button_text"), "Primary button text");
        assert_eq!(lookup("home", "cta").unwrap().title(), "Home / Cta");
    }
}
