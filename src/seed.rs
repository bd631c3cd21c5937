//! Default content. Seeding a target deletes what is stored for it and inserts
//! the defaults again, so it is safe to rerun.

use crate::domain::{
    BlogPostInput, FooterLinkInput, FooterSectionInput, NavbarItemInput, ServiceCategoryInput, ServicePostInput,
    ServiceSubcategoryInput, StoreSettings, TagsInput, TestimonialInput,
};
use crate::error::{CmsError, Result};
use crate::sections::{self, SectionDef, SECTIONS};
use crate::storage::{Database, SectionDocument};
use serde_json::{json, Value};
use tracing::info;

/// Seed targets that are not page sections.
pub const RESOURCE_TARGETS: [&str; 6] = ["store-settings", "navbar", "footer", "services", "blog", "testimonials"];

#[derive(Debug, Default)]
pub struct SeedReport {
    pub seeded: Vec<(String, usize)>,
}

impl SeedReport {
    fn add(&mut self, target: &str, count: usize) {
        info!("Seeded {} ({} rows)", target, count);
        self.seeded.push((target.to_string(), count));
    }

    pub fn total(&self) -> usize {
        self.seeded.iter().map(|(_, n)| n).sum()
    }
}

/// Seeds everything, or only `only` (`<page>.<section>` or a resource name).
pub fn seed(db: &Database, only: Option<&str>) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    match only {
        Some(target) => seed_target(db, target, &mut report)?,
        None => {
            for target in RESOURCE_TARGETS {
                seed_target(db, target, &mut report)?;
            }
            for def in SECTIONS {
                seed_section(db, def, &mut report)?;
            }
        }
    }
    Ok(report)
}

fn seed_target(db: &Database, target: &str, report: &mut SeedReport) -> Result<()> {
    match target {
        "store-settings" => seed_store_settings(db, report),
        "navbar" => seed_navbar(db, report),
        "footer" => seed_footer(db, report),
        "services" => seed_services(db, report),
        "blog" => seed_blog(db, report),
        "testimonials" => seed_testimonials(db, report),
        key => match sections::lookup_key(key) {
            Some(def) => seed_section(db, def, report),
            None => Err(CmsError::validation(format!("unknown seed target '{key}'"))),
        },
    }
}

fn seed_section(db: &Database, def: &SectionDef, report: &mut SeedReport) -> Result<()> {
    let collection = def.collection();
    db.clear_collection(&collection)?;
    let items = section_defaults(def.page, def.section);
    for (order, item) in items.iter().enumerate() {
        let payload = def.normalize(item, false)?;
        let mut doc = SectionDocument::new(&collection, payload.into_data());
        doc.display_order = order as i64;
        db.insert_document(&mut doc, def.is_singleton())?;
    }
    report.add(&collection, items.len());
    Ok(())
}

fn cta(title: &str, description: &str) -> Vec<Value> {
    vec![json!({
        "title": title,
        "description": description,
        "button_text": "Get in touch",
        "button_link": "/contact",
    })]
}

fn section_defaults(page: &str, section: &str) -> Vec<Value> {
    match (page, section) {
        ("home", "hero") => vec![json!({
            "title": "Content that earns attention",
            "subtitle": "Strategy, writing and distribution for growing brands",
            "description": "We plan, write and ship the articles, guides and campaigns that turn readers into customers.",
            "primary_button_text": "Start a project",
            "primary_button_link": "/contact",
            "secondary_button_text": "Our services",
            "secondary_button_link": "/services",
        })],
        ("home", "journey") => vec![json!({
            "title": "How we work with you",
            "subtitle": "From first call to measurable results",
            "steps": ["Discovery call", "Content strategy", "Production", "Distribution", "Reporting"],
        })],
        ("home", "stats") => vec![
            json!({"value": "250", "suffix": "+", "label": "Articles published"}),
            json!({"value": "40", "suffix": "+", "label": "Brands served"}),
            json!({"value": "3", "suffix": "x", "label": "Average traffic growth"}),
            json!({"value": "98", "suffix": "%", "label": "Client retention"}),
        ],
        ("home", "features") => vec![
            json!({"title": "Research-led strategy", "description": "Topics chosen from search data and customer interviews.", "icon": "compass"}),
            json!({"title": "Senior writers", "description": "Subject-matter writers, edited in house.", "icon": "pen"}),
            json!({"title": "Distribution built in", "description": "Every piece ships with a promotion plan.", "icon": "megaphone"}),
        ],
        ("home", "cta") => cta("Ready to grow your audience?", "Tell us about your goals and we will propose a plan within a week."),
        ("about", "hero") => vec![json!({
            "title": "About us",
            "subtitle": "A small team of editors, strategists and writers",
        })],
        ("about", "journey") => vec![json!({
            "title": "Our story",
            "story": "<p>We started as two freelance writers and grew into an agency by keeping the same standard for every piece.</p>",
            "founded_year": 2016,
        })],
        ("about", "philosophy") => vec![json!({
            "title": "Our philosophy",
            "description": "Useful content compounds. We write for readers first and search engines second.",
            "quote": "Clarity is a form of respect.",
            "quote_author": "Our founding editor",
        })],
        ("about", "principles") => vec![
            json!({"title": "Reader first", "description": "Every piece answers a real question.", "icon": "eye"}),
            json!({"title": "Measured", "description": "We report on outcomes, not output.", "icon": "chart"}),
            json!({"title": "Transparent", "description": "Shared calendars, open drafts, clear pricing.", "icon": "sun"}),
        ],
        ("about", "team") => vec![
            json!({"name": "Alex Morgan", "role": "Managing Editor", "bio": "Fifteen years in newsrooms and content teams."}),
            json!({"name": "Sam Rivera", "role": "Head of Strategy", "bio": "Turns search data into editorial calendars."}),
        ],
        ("about", "cta") => cta("Work with us", "We take on a handful of new clients each quarter."),
        ("services", "hero") => vec![json!({
            "title": "Services",
            "subtitle": "Everything you need to run a content program",
        })],
        ("services", "process") => vec![
            json!({"step_number": 1, "title": "Audit", "description": "We review what you have and what performs."}),
            json!({"step_number": 2, "title": "Plan", "description": "A quarterly calendar tied to your goals."}),
            json!({"step_number": 3, "title": "Produce", "description": "Drafts, edits and final assets on schedule."}),
            json!({"step_number": 4, "title": "Measure", "description": "Monthly reporting and adjustments."}),
        ],
        ("services", "features") => vec![
            json!({"title": "Fixed monthly pricing", "icon": "tag"}),
            json!({"title": "Dedicated editor", "icon": "user"}),
        ],
        ("services", "cta") => cta("Not sure where to start?", "Book a free content audit."),
        ("contact", "hero") => vec![json!({
            "title": "Contact us",
            "subtitle": "We reply within one business day",
        })],
        ("contact", "info") => vec![json!({
            "email": "hello@example.com",
            "phone": "+1 555 0100",
            "address": "100 Market Street, Suite 300",
            "hours": "Mon to Fri, 9:00 to 17:00",
        })],
        ("contact", "form") => vec![json!({
            "title": "Send us a message",
            "submit_text": "Send message",
            "success_message": "Thanks, we will be in touch shortly.",
        })],
        ("faq", "hero") => vec![json!({
            "title": "Frequently asked questions",
        })],
        ("faq", "items") => vec![
            json!({"question": "How long until we see results?", "answer": "Most clients see organic growth within three to six months.", "category": "General"}),
            json!({"question": "Do you write in our brand voice?", "answer": "Yes. We start every engagement with a voice and style guide.", "category": "Process"}),
            json!({"question": "Can we pause the retainer?", "answer": "Retainers can be paused with 30 days notice.", "category": "Billing"}),
        ],
        ("terms", "hero") => vec![json!({
            "title": "Terms of service",
            "last_updated": "January 1, 2025",
        })],
        ("terms", "sections") => vec![
            json!({"title": "Use of this site", "content": "<p>Content on this site is provided for general information.</p>"}),
            json!({"title": "Privacy", "content": "<p>We only use contact form data to answer your request.</p>"}),
        ],
        ("site", "seo") => vec![json!({ "sitemap_exclude": [] })],
        _ => Vec::new(),
    }
}

fn seed_store_settings(db: &Database, report: &mut SeedReport) -> Result<()> {
    db.clear_store_settings()?;
    db.upsert_store_settings(StoreSettings {
        site_name: Some("Northwind Content".into()),
        tagline: Some("Content marketing that compounds".into()),
        contact_email: Some("hello@example.com".into()),
        meta_title: Some("Northwind Content | Content marketing agency".into()),
        meta_description: Some("Strategy, writing and distribution for growing brands.".into()),
        footer_text: Some("All rights reserved.".into()),
        ..Default::default()
    })?;
    report.add("store-settings", 1);
    Ok(())
}

fn seed_navbar(db: &Database, report: &mut SeedReport) -> Result<()> {
    db.clear_navbar()?;
    let top = [("Home", "/"), ("About", "/about"), ("Services", "/services"), ("Blog", "/blog"), ("FAQ", "/faq"), ("Contact", "/contact")];
    for (order, (label, href)) in top.iter().enumerate() {
        let mut item = NavbarItemInput {
            label: Some(label.to_string()),
            href: Some(href.to_string()),
            display_order: Some(order as i64),
            ..Default::default()
        }
        .into_item()?;
        db.create_navbar_item(&mut item)?;
    }
    report.add("navbar", top.len());
    Ok(())
}

fn seed_footer(db: &Database, report: &mut SeedReport) -> Result<()> {
    db.clear_footer()?;
    let sections: [(&str, &[(&str, &str)]); 2] = [
        ("Company", &[("About", "/about"), ("Contact", "/contact")]),
        ("Resources", &[("Blog", "/blog"), ("FAQ", "/faq"), ("Terms", "/terms")]),
    ];
    let mut rows = 0;
    for (order, (title, links)) in sections.iter().enumerate() {
        let mut section = FooterSectionInput {
            title: Some(title.to_string()),
            display_order: Some(order as i64),
            ..Default::default()
        }
        .into_section()?;
        db.create_footer_section(&mut section)?;
        rows += 1;
        for (link_order, (label, href)) in links.iter().enumerate() {
            let mut link = FooterLinkInput {
                label: Some(label.to_string()),
                href: Some(href.to_string()),
                display_order: Some(link_order as i64),
                ..Default::default()
            }
            .into_link(section.id)?;
            db.create_footer_link(&mut link)?;
            rows += 1;
        }
    }
    report.add("footer", rows);
    Ok(())
}

fn seed_services(db: &Database, report: &mut SeedReport) -> Result<()> {
    db.clear_services()?;
    let mut category = ServiceCategoryInput {
        name: Some("Content Marketing".into()),
        description: Some("Planning and producing content that ranks and converts.".into()),
        ..Default::default()
    }
    .into_category()?;
    db.create_service_category(&mut category)?;

    let mut sub = ServiceSubcategoryInput {
        category_id: Some(category.id),
        name: Some("Blog Writing".into()),
        ..Default::default()
    }
    .into_subcategory()?;
    db.create_service_subcategory(&mut sub)?;

    let posts = [
        ("Content Strategy", "compass", "<p>A research-backed plan covering topics, formats and channels.</p>", None),
        ("Blog Writing", "pen", "<p>Long-form articles written by specialists and edited in house.</p>", Some(sub.id)),
        ("SEO Optimisation", "search", "<p>On-page improvements and content refreshes for existing pages.</p>", None),
    ];
    for (order, (title, icon, content, subcategory_id)) in posts.iter().enumerate() {
        let mut post = ServicePostInput {
            title: Some(title.to_string()),
            icon: Some(icon.to_string()),
            content: Some(content.to_string()),
            category_id: Some(category.id),
            subcategory_id: *subcategory_id,
            status: Some("published".into()),
            display_order: Some(order as i64),
            ..Default::default()
        }
        .into_post()?;
        db.create_service_post(&mut post)?;
    }
    report.add("services", posts.len() + 2);
    Ok(())
}

fn seed_blog(db: &Database, report: &mut SeedReport) -> Result<()> {
    db.clear_blog_posts()?;
    let posts = [
        ("Building a content calendar that lasts", "Strategy, Planning", true),
        ("Ten headline patterns that get clicks", "Writing", false),
        ("Measuring content ROI without guesswork", "Analytics, Strategy", false),
    ];
    for (title, tags, featured) in posts {
        let mut post = BlogPostInput {
            title: Some(title.to_string()),
            content: Some(format!(
                "<p>{title} starts with a clear goal.</p><p>In this post we walk through the steps our editors use with every client.</p>"
            )),
            tags: Some(TagsInput::Joined(tags.to_string())),
            status: Some("published".into()),
            is_featured: Some(featured),
            ..Default::default()
        }
        .into_post()?;
        db.create_blog_post(&mut post)?;
    }
    report.add("blog", posts.len());
    Ok(())
}

fn seed_testimonials(db: &Database, report: &mut SeedReport) -> Result<()> {
    db.clear_testimonials()?;
    let quotes = [
        ("Priya Shah", "Head of Marketing", "Brightleaf", "Organic sign-ups doubled in two quarters."),
        ("Tom Becker", "Founder", "Cask & Co", "They write like they have worked here for years."),
        ("Lena Ortiz", "CMO", "Fieldnote", "The most reliable content partner we have had."),
    ];
    for (order, (name, role, company, content)) in quotes.iter().enumerate() {
        let mut t = TestimonialInput {
            name: Some(name.to_string()),
            role: Some(role.to_string()),
            company: Some(company.to_string()),
            content: Some(content.to_string()),
            display_order: Some(order as i64),
            ..Default::default()
        }
        .into_testimonial()?;
        db.create_testimonial(&mut t)?;
    }
    report.add("testimonials", quotes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_section_has_valid_defaults() {
        for def in SECTIONS {
            let items = section_defaults(def.page, def.section);
            assert!(!items.is_empty(), "no defaults for {}", def.collection());
            if def.is_singleton() {
                assert_eq!(items.len(), 1, "{} is a singleton", def.collection());
            }
            for item in &items {
                def.normalize(item, false).unwrap();
            }
        }
    }

    #[test]
    fn full_seed_is_repeatable() {
        let db = Database::open_in_memory().unwrap();
        let first = seed(&db, None).unwrap();
        let second = seed(&db, None).unwrap();
        assert_eq!(first.total(), second.total());
        assert_eq!(db.list_documents("home.stats", true).unwrap().len(), 4);
        assert_eq!(db.list_navbar_items(true).unwrap().len(), 6);
    }

    #[test]
    fn seeding_one_target_leaves_others() {
        let db = Database::open_in_memory().unwrap();
        seed(&db, None).unwrap();
        db.clear_collection("faq.items").unwrap();
        seed(&db, Some("faq.items")).unwrap();
        assert_eq!(db.list_documents("faq.items", false).unwrap().len(), 3);
        assert!(seed(&db, Some("pricing.table")).is_err());
    }
}
