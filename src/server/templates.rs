//! Askama templates and the view models they render.

use crate::content::{excerpt, format_date};
use crate::constants::EXCERPT_CHARS;
use crate::domain::{BlogPost, FooterSection, NavbarNode, ServiceCategory, ServicePost, StoreSettings, Testimonial};
use crate::storage::SectionDocument;
use askama::Template;
use chrono::{Datelike, Utc};

/// Header, navigation and footer shared by every public page.
pub struct Chrome {
    pub site_name: String,
    pub tagline: String,
    pub logo_url: Option<String>,
    pub favicon_url: Option<String>,
    pub nav: Vec<NavbarNode>,
    pub footer: Vec<FooterSection>,
    pub footer_text: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub socials: Vec<(&'static str, String)>,
    pub noindex: bool,
    pub year: i32,
}

impl Chrome {
    pub fn new(settings: StoreSettings, nav: Vec<NavbarNode>, footer: Vec<FooterSection>, noindex: bool) -> Self {
        let socials = [
            ("Facebook", &settings.facebook_url),
            ("Twitter", &settings.twitter_url),
            ("LinkedIn", &settings.linkedin_url),
            ("Instagram", &settings.instagram_url),
        ]
        .into_iter()
        .filter_map(|(name, url)| url.clone().map(|u| (name, u)))
        .collect();

        Self {
            site_name: settings.site_name_or_default().to_string(),
            tagline: settings.tagline.clone().unwrap_or_default(),
            footer_text: settings.footer_text.clone().unwrap_or_default(),
            logo_url: settings.logo_url,
            favicon_url: settings.favicon_url,
            contact_email: settings.contact_email,
            contact_phone: settings.contact_phone,
            nav,
            footer,
            socials,
            noindex,
            year: Utc::now().year(),
        }
    }
}

pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub canonical: String,
}

#[derive(Debug, Clone)]
pub struct PostCard {
    pub title: String,
    pub href: String,
    pub excerpt: String,
    pub image: Option<String>,
    pub date: String,
    pub read_time: i64,
    pub tags: Vec<String>,
}

impl PostCard {
    pub fn from_blog(post: &BlogPost) -> Self {
        Self {
            title: post.title.clone(),
            href: format!("/blog/{}", post.slug),
            excerpt: post
                .excerpt
                .clone()
                .unwrap_or_else(|| excerpt(&post.content, EXCERPT_CHARS)),
            image: post.featured_image.clone(),
            date: format_date(&post.published_at.unwrap_or(post.created_at)),
            read_time: post.read_time,
            tags: post.tags.clone(),
        }
    }

    pub fn from_service(post: &ServicePost) -> Self {
        Self {
            title: post.title.clone(),
            href: format!("/services/{}", post.slug),
            excerpt: post
                .excerpt
                .clone()
                .unwrap_or_else(|| excerpt(&post.content, EXCERPT_CHARS)),
            image: post.featured_image.clone(),
            date: format_date(&post.published_at.unwrap_or(post.created_at)),
            read_time: post.read_time,
            tags: post.category_name.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TestimonialCard {
    pub name: String,
    pub byline: String,
    pub content: String,
    pub image_url: Option<String>,
    pub stars: String,
}

impl From<&Testimonial> for TestimonialCard {
    fn from(t: &Testimonial) -> Self {
        let byline = match (&t.role, &t.company) {
            (Some(role), Some(company)) => format!("{role}, {company}"),
            (Some(one), None) | (None, Some(one)) => one.clone(),
            (None, None) => String::new(),
        };
        let rating = t.rating.clamp(0, 5) as usize;
        Self {
            name: t.name.clone(),
            byline,
            content: t.content.clone(),
            image_url: t.image_url.clone(),
            stars: format!("{}{}", "★".repeat(rating), "☆".repeat(5 - rating)),
        }
    }
}

/// Service category with its published posts, for the services index.
pub struct CategoryGroup {
    pub category: ServiceCategory,
    pub services: Vec<PostCard>,
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub chrome: Chrome,
    pub meta: PageMeta,
    pub hero: SectionDocument,
    pub journey: SectionDocument,
    pub stats: Vec<SectionDocument>,
    pub features: Vec<SectionDocument>,
    pub cta: SectionDocument,
    pub services: Vec<PostCard>,
    pub posts: Vec<PostCard>,
    pub testimonials: Vec<TestimonialCard>,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub chrome: Chrome,
    pub meta: PageMeta,
    pub hero: SectionDocument,
    pub journey: SectionDocument,
    pub philosophy: SectionDocument,
    pub principles: Vec<SectionDocument>,
    pub team: Vec<SectionDocument>,
    pub cta: SectionDocument,
}

#[derive(Template)]
#[template(path = "services.html")]
pub struct ServicesTemplate {
    pub chrome: Chrome,
    pub meta: PageMeta,
    pub hero: SectionDocument,
    pub process: Vec<SectionDocument>,
    pub features: Vec<SectionDocument>,
    pub cta: SectionDocument,
    pub groups: Vec<CategoryGroup>,
    pub uncategorized: Vec<PostCard>,
}

#[derive(Template)]
#[template(path = "service_detail.html")]
pub struct ServiceDetailTemplate {
    pub chrome: Chrome,
    pub meta: PageMeta,
    pub service: ServicePost,
    pub date: String,
    pub testimonials: Vec<TestimonialCard>,
    pub related: Vec<PostCard>,
}

#[derive(Template)]
#[template(path = "blog_index.html")]
pub struct BlogIndexTemplate {
    pub chrome: Chrome,
    pub meta: PageMeta,
    pub posts: Vec<PostCard>,
    pub categories: Vec<crate::content::CategoryCount>,
    pub category: String,
    pub search: String,
    pub page: usize,
    pub page_count: usize,
    pub total: usize,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
}

#[derive(Template)]
#[template(path = "blog_post.html")]
pub struct BlogPostTemplate {
    pub chrome: Chrome,
    pub meta: PageMeta,
    pub post: BlogPost,
    pub date: String,
    pub related: Vec<PostCard>,
}

#[derive(Template)]
#[template(path = "faq.html")]
pub struct FaqTemplate {
    pub chrome: Chrome,
    pub meta: PageMeta,
    pub hero: SectionDocument,
    pub items: Vec<SectionDocument>,
}

#[derive(Template)]
#[template(path = "terms.html")]
pub struct TermsTemplate {
    pub chrome: Chrome,
    pub meta: PageMeta,
    pub hero: SectionDocument,
    pub sections: Vec<SectionDocument>,
}

/// Values echoed back into the contact form after a failed submission.
#[derive(Debug, Clone, Default)]
pub struct ContactFormValues {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub service: String,
    pub message: String,
}

#[derive(Template)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub chrome: Chrome,
    pub meta: PageMeta,
    pub hero: SectionDocument,
    pub info: SectionDocument,
    pub form: SectionDocument,
    pub services: Vec<String>,
    pub values: ContactFormValues,
    pub error: Option<String>,
    pub success: Option<String>,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub chrome: Chrome,
    pub meta: PageMeta,
}

// Back-office

#[derive(Template)]
#[template(path = "admin/login.html")]
pub struct AdminLoginTemplate {
    pub error: Option<String>,
    pub email: String,
}

pub struct AdminLink {
    pub title: String,
    pub href: String,
    pub group: &'static str,
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
pub struct AdminDashboardTemplate {
    pub user_name: String,
    pub is_admin: bool,
    pub unread_messages: usize,
    pub links: Vec<AdminLink>,
}

/// One input of a back-office form.
pub struct EditorField {
    pub name: String,
    pub label: String,
    /// `text`, `textarea`, `url`, `email`, `password`, `number`, `checkbox`,
    /// `lines`, `ids` or `select`.
    pub input: &'static str,
    pub required: bool,
    pub options: Vec<&'static str>,
}

#[derive(Template)]
#[template(path = "admin/editor.html")]
pub struct AdminEditorTemplate {
    pub user_name: String,
    pub title: String,
    pub description: String,
    /// GET endpoint for the current data.
    pub list_url: String,
    /// POST endpoint for new items; `{field}` placeholders are filled from the form.
    pub create_url: String,
    /// PUT/DELETE endpoint for one item; `{id}` is replaced client-side.
    pub item_url: String,
    /// When set, the listed rows are this nested array of every record.
    pub list_key: String,
    /// Comma-separated record fields shown in the table.
    pub columns: String,
    pub singleton: bool,
    pub can_create: bool,
    pub fields: Vec<EditorField>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn testimonial(role: Option<&str>, company: Option<&str>, rating: i64) -> Testimonial {
        let now = Utc::now();
        Testimonial {
            id: 1,
            name: "Grace".into(),
            role: role.map(String::from),
            company: company.map(String::from),
            content: "Great work".into(),
            image_url: None,
            rating,
            display_order: 0,
            is_active: true,
            service_ids: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn testimonial_card_byline_and_stars() {
        let card = TestimonialCard::from(&testimonial(Some("CMO"), Some("Acme"), 4));
        assert_eq!(card.byline, "CMO, Acme");
        assert_eq!(card.stars, "★★★★☆");
        assert_eq!(TestimonialCard::from(&testimonial(None, Some("Acme"), 5)).byline, "Acme");
    }

    #[test]
    fn chrome_collects_configured_socials() {
        let settings = StoreSettings {
            site_name: Some("Northwind".into()),
            linkedin_url: Some("https://linkedin.com/company/northwind".into()),
            ..Default::default()
        };
        let chrome = Chrome::new(settings, vec![], vec![], false);
        assert_eq!(chrome.site_name, "Northwind");
        assert_eq!(chrome.socials.len(), 1);
        assert_eq!(chrome.socials[0].0, "LinkedIn");
    }
}
