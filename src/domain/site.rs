use super::{merge, merge_optional, merge_required, optional, required};
use crate::error::{CmsError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testimonial {
    pub id: i64,
    pub name: String,
    pub role: Option<String>,
    pub company: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    pub rating: i64,
    pub display_order: i64,
    pub is_active: bool,
    pub service_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestimonialInput {
    pub name: Option<String>,
    pub role: Option<String>,
    pub company: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub rating: Option<i64>,
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,
    pub service_ids: Option<Vec<i64>>,
}

fn check_rating(rating: i64) -> Result<i64> {
    if !(1..=5).contains(&rating) {
        return Err(CmsError::validation("rating must be between 1 and 5"));
    }
    Ok(rating)
}

impl TestimonialInput {
    pub fn into_testimonial(self) -> Result<Testimonial> {
        let now = Utc::now();
        Ok(Testimonial {
            id: 0,
            name: required(&self.name, "name")?,
            content: required(&self.content, "content")?,
            role: optional(self.role),
            company: optional(self.company),
            image_url: optional(self.image_url),
            rating: check_rating(self.rating.unwrap_or(5))?,
            display_order: self.display_order.unwrap_or(0),
            is_active: self.is_active.unwrap_or(true),
            service_ids: self.service_ids.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_to(self, t: &mut Testimonial) -> Result<()> {
        merge_required(&mut t.name, &self.name, "name")?;
        merge_required(&mut t.content, &self.content, "content")?;
        merge_optional(&mut t.role, self.role);
        merge_optional(&mut t.company, self.company);
        merge_optional(&mut t.image_url, self.image_url);
        if let Some(rating) = self.rating {
            t.rating = check_rating(rating)?;
        }
        merge(&mut t.display_order, self.display_order);
        merge(&mut t.is_active, self.is_active);
        merge(&mut t.service_ids, self.service_ids);
        t.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavbarItem {
    pub id: i64,
    pub label: String,
    pub href: String,
    pub parent_id: Option<i64>,
    pub display_order: i64,
    pub is_active: bool,
    pub open_in_new_tab: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NavbarItemInput {
    pub label: Option<String>,
    pub href: Option<String>,
    pub parent_id: Option<i64>,
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,
    pub open_in_new_tab: Option<bool>,
}

impl NavbarItemInput {
    pub fn into_item(self) -> Result<NavbarItem> {
        let now = Utc::now();
        Ok(NavbarItem {
            id: 0,
            label: required(&self.label, "label")?,
            href: required(&self.href, "href")?,
            parent_id: self.parent_id,
            display_order: self.display_order.unwrap_or(0),
            is_active: self.is_active.unwrap_or(true),
            open_in_new_tab: self.open_in_new_tab.unwrap_or(false),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_to(self, item: &mut NavbarItem) -> Result<()> {
        merge_required(&mut item.label, &self.label, "label")?;
        merge_required(&mut item.href, &self.href, "href")?;
        if self.parent_id.is_some() {
            if self.parent_id == Some(item.id) {
                return Err(CmsError::validation("an item cannot be its own parent"));
            }
            item.parent_id = self.parent_id;
        }
        merge(&mut item.display_order, self.display_order);
        merge(&mut item.is_active, self.is_active);
        merge(&mut item.open_in_new_tab, self.open_in_new_tab);
        item.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NavbarNode {
    #[serde(flatten)]
    pub item: NavbarItem,
    pub children: Vec<NavbarNode>,
}

/// Nests items under their parents. Items are expected in display order; orphans
/// (parent missing or filtered out) are promoted to the top level.
pub fn build_navbar_tree(items: &[NavbarItem]) -> Vec<NavbarNode> {
    fn children_of(items: &[NavbarItem], parent: i64, depth: usize) -> Vec<NavbarNode> {
        if depth > 8 {
            return Vec::new();
        }
        items
            .iter()
            .filter(|i| i.parent_id == Some(parent))
            .map(|i| NavbarNode {
                item: i.clone(),
                children: children_of(items, i.id, depth + 1),
            })
            .collect()
    }

    items
        .iter()
        .filter(|i| match i.parent_id {
            None => true,
            Some(p) => !items.iter().any(|other| other.id == p),
        })
        .map(|i| NavbarNode {
            item: i.clone(),
            children: children_of(items, i.id, 1),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FooterSection {
    pub id: i64,
    pub title: String,
    pub display_order: i64,
    pub is_active: bool,
    pub links: Vec<FooterLink>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FooterSectionInput {
    pub title: Option<String>,
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,
}

impl FooterSectionInput {
    pub fn into_section(self) -> Result<FooterSection> {
        let now = Utc::now();
        Ok(FooterSection {
            id: 0,
            title: required(&self.title, "title")?,
            display_order: self.display_order.unwrap_or(0),
            is_active: self.is_active.unwrap_or(true),
            links: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_to(self, section: &mut FooterSection) -> Result<()> {
        merge_required(&mut section.title, &self.title, "title")?;
        merge(&mut section.display_order, self.display_order);
        merge(&mut section.is_active, self.is_active);
        section.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FooterLink {
    pub id: i64,
    pub section_id: i64,
    pub label: String,
    pub href: String,
    pub display_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FooterLinkInput {
    pub section_id: Option<i64>,
    pub label: Option<String>,
    pub href: Option<String>,
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,
}

impl FooterLinkInput {
    pub fn into_link(self, section_id: i64) -> Result<FooterLink> {
        let now = Utc::now();
        Ok(FooterLink {
            id: 0,
            section_id,
            label: required(&self.label, "label")?,
            href: required(&self.href, "href")?,
            display_order: self.display_order.unwrap_or(0),
            is_active: self.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_to(self, link: &mut FooterLink) -> Result<()> {
        merge(&mut link.section_id, self.section_id);
        merge_required(&mut link.label, &self.label, "label")?;
        merge_required(&mut link.href, &self.href, "href")?;
        merge(&mut link.display_order, self.display_order);
        merge(&mut link.is_active, self.is_active);
        link.updated_at = Utc::now();
        Ok(())
    }
}

/// Store-wide settings, a single row. Every field is optional so the same shape
/// serves as the stored record and as a partial update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StoreSettings {
    pub fn apply(&mut self, patch: StoreSettings) {
        merge_optional(&mut self.site_name, patch.site_name);
        merge_optional(&mut self.tagline, patch.tagline);
        merge_optional(&mut self.logo_url, patch.logo_url);
        merge_optional(&mut self.favicon_url, patch.favicon_url);
        merge_optional(&mut self.contact_email, patch.contact_email);
        merge_optional(&mut self.contact_phone, patch.contact_phone);
        merge_optional(&mut self.address, patch.address);
        merge_optional(&mut self.facebook_url, patch.facebook_url);
        merge_optional(&mut self.twitter_url, patch.twitter_url);
        merge_optional(&mut self.linkedin_url, patch.linkedin_url);
        merge_optional(&mut self.instagram_url, patch.instagram_url);
        merge_optional(&mut self.meta_title, patch.meta_title);
        merge_optional(&mut self.meta_description, patch.meta_description);
        merge_optional(&mut self.footer_text, patch.footer_text);
        self.updated_at = Some(Utc::now());
    }

    pub fn site_name_or_default(&self) -> &str {
        self.site_name.as_deref().unwrap_or("Our Agency")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, parent_id: Option<i64>) -> NavbarItem {
        NavbarItemInput {
            label: Some(format!("Item {id}")),
            href: Some(format!("/{id}")),
            parent_id,
            ..Default::default()
        }
        .into_item()
        .map(|mut i| {
            i.id = id;
            i
        })
        .unwrap()
    }

    #[test]
    fn navbar_tree_nests_and_promotes_orphans() {
        let items = vec![item(1, None), item(2, Some(1)), item(3, Some(2)), item(4, Some(99))];
        let tree = build_navbar_tree(&items);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].item.id, 1);
        assert_eq!(tree[0].children[0].item.id, 2);
        assert_eq!(tree[0].children[0].children[0].item.id, 3);
        assert_eq!(tree[1].item.id, 4);
    }

    #[test]
    fn rating_is_bounded() {
        let input = TestimonialInput {
            name: Some("Jo".into()),
            content: Some("Great".into()),
            rating: Some(6),
            ..Default::default()
        };
        assert!(input.into_testimonial().is_err());
    }

    #[test]
    fn settings_patch_keeps_unset_fields() {
        let mut settings = StoreSettings {
            site_name: Some("Agency".into()),
            tagline: Some("We write".into()),
            ..Default::default()
        };
        settings.apply(StoreSettings {
            tagline: Some(String::new()),
            logo_url: Some("/uploads/logo.png".into()),
            ..Default::default()
        });
        assert_eq!(settings.site_name.as_deref(), Some("Agency"));
        assert_eq!(settings.tagline, None);
        assert_eq!(settings.logo_url.as_deref(), Some("/uploads/logo.png"));
        assert!(settings.updated_at.is_some());
    }
}
