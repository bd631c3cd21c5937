//! Server-rendered public site plus `sitemap.xml` and `robots.txt`.
//!
//! Page data is read through the tag cache; every write through the API
//! evicts the matching tag.

use super::api::contact::record_submission;
use super::templates::*;
use super::AppState;
use crate::constants::{
    section_tag, BLOG_INDEX_PAGE_SIZE, CAROUSEL_MIN_ITEMS, MAX_PAGE_SIZE, STATIC_PAGES, TAG_BLOG, TAG_FOOTER,
    TAG_NAVBAR, TAG_SERVICES, TAG_STORE_SETTINGS, TAG_TESTIMONIALS,
};
use crate::content::{aggregate_categories, carousel_items, format_date, CategoryCount, Pagination};
use crate::domain::{
    build_navbar_tree, BlogPost, BlogQuery, ContactInput, FooterSection, NavbarItem, PostStatus, ServiceCategory,
    ServicePost, ServiceQuery, StoreSettings, Testimonial,
};
use crate::error::{CmsError, Result};
use crate::storage::SectionDocument;
use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use tracing::error;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/about", get(about))
        .route("/services", get(services_index))
        .route("/services/:slug", get(service_detail))
        .route("/blog", get(blog_index))
        .route("/blog/:slug", get(blog_post))
        .route("/faq", get(faq))
        .route("/terms", get(terms))
        .route("/contact", get(contact_page).post(contact_submit))
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots))
}

/// Internal failure while building a page. Logged, rendered as a bare 500.
pub struct PageError(CmsError);

impl From<CmsError> for PageError {
    fn from(e: CmsError) -> Self {
        PageError(e)
    }
}

impl From<askama::Error> for PageError {
    fn from(e: askama::Error) -> Self {
        PageError(CmsError::Template(e))
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        error!("Page rendering failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<h1>Something went wrong</h1><p>Please try again in a moment.</p>".to_string()),
        )
            .into_response()
    }
}

type PageResult = std::result::Result<Response, PageError>;

fn render<T: Template>(template: &T) -> PageResult {
    Ok(Html(template.render()?).into_response())
}

// Cached loaders

fn singleton(state: &AppState, page: &str, section: &str) -> Result<SectionDocument> {
    let collection = format!("{page}.{section}");
    let doc: Option<SectionDocument> =
        state
            .cache
            .get_or_load(&section_tag(page, section), || state.db.active_document(&collection))?;
    Ok(doc.unwrap_or_else(|| SectionDocument::new(&collection, Map::new())))
}

fn collection(state: &AppState, page: &str, section: &str) -> Result<Vec<SectionDocument>> {
    let name = format!("{page}.{section}");
    state
        .cache
        .get_or_load(&section_tag(page, section), || state.db.list_documents(&name, false))
}

fn settings(state: &AppState) -> Result<StoreSettings> {
    let stored: Option<StoreSettings> = state
        .cache
        .get_or_load(TAG_STORE_SETTINGS, || state.db.get_store_settings())?;
    Ok(stored.unwrap_or_default())
}

fn testimonials(state: &AppState) -> Result<Vec<Testimonial>> {
    state
        .cache
        .get_or_load(TAG_TESTIMONIALS, || state.db.list_testimonials(None, false))
}

fn chrome(state: &AppState) -> Result<Chrome> {
    let nav: Vec<NavbarItem> = state
        .cache
        .get_or_load(TAG_NAVBAR, || state.db.list_navbar_items(false))?;
    let footer: Vec<FooterSection> = state
        .cache
        .get_or_load(TAG_FOOTER, || state.db.list_footer_sections(false))?;
    let noindex = singleton(state, "site", "seo")?
        .data
        .get("noindex")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    Ok(Chrome::new(settings(state)?, build_navbar_tree(&nav), footer, noindex))
}

fn meta(state: &AppState, chrome: &Chrome, path: &str, title: &str, description: &str) -> PageMeta {
    let title = if title.is_empty() || title == chrome.site_name {
        chrome.site_name.clone()
    } else {
        format!("{} | {}", title, chrome.site_name)
    };
    PageMeta {
        title,
        description: description.to_string(),
        canonical: format!("{}{}", state.config.site_url(), path),
    }
}

/// Description from the section if it has one, else the site-wide default.
fn describe(doc: &SectionDocument, settings_default: &str) -> String {
    ["description", "subtitle"]
        .iter()
        .map(|f| doc.text(f))
        .find(|s| !s.is_empty())
        .unwrap_or(settings_default)
        .to_string()
}

fn published_blog(state: &AppState, limit: usize) -> Result<Vec<BlogPost>> {
    let key = format!("{TAG_BLOG}|latest={limit}");
    state.cache.get_or_load(&key, || {
        let query = BlogQuery {
            status: Some(PostStatus::Published),
            page: Pagination::new(Some(limit), None),
            ..Default::default()
        };
        Ok(state.db.list_blog_posts(&query)?.0)
    })
}

#[derive(Serialize, Deserialize)]
struct ServiceCatalog {
    categories: Vec<ServiceCategory>,
    services: Vec<ServicePost>,
}

fn service_catalog(state: &AppState) -> Result<ServiceCatalog> {
    let key = format!("{TAG_SERVICES}|catalog");
    state.cache.get_or_load(&key, || {
        Ok(ServiceCatalog {
            categories: state.db.list_service_categories(false)?,
            services: all_published_services(state)?,
        })
    })
}

fn all_published_blog(state: &AppState) -> Result<Vec<BlogPost>> {
    let mut out = Vec::new();
    loop {
        let query = BlogQuery {
            status: Some(PostStatus::Published),
            page: Pagination::new(Some(MAX_PAGE_SIZE), Some(out.len())),
            ..Default::default()
        };
        let (page, total) = state.db.list_blog_posts(&query)?;
        let exhausted = page.is_empty();
        out.extend(page);
        if exhausted || out.len() >= total {
            return Ok(out);
        }
    }
}

fn all_published_services(state: &AppState) -> Result<Vec<ServicePost>> {
    let mut out = Vec::new();
    loop {
        let query = ServiceQuery {
            status: Some(PostStatus::Published),
            page: Pagination::new(Some(MAX_PAGE_SIZE), Some(out.len())),
            ..Default::default()
        };
        let (page, total) = state.db.list_service_posts(&query)?;
        let exhausted = page.is_empty();
        out.extend(page);
        if exhausted || out.len() >= total {
            return Ok(out);
        }
    }
}

fn not_found_page(state: &AppState) -> PageResult {
    let chrome = chrome(state)?;
    let meta = meta(state, &chrome, "/404", "Page not found", "");
    let body = NotFoundTemplate { chrome, meta }.render()?;
    Ok((StatusCode::NOT_FOUND, Html(body)).into_response())
}

/// Router fallback.
pub async fn not_found(State(state): State<AppState>) -> PageResult {
    not_found_page(&state)
}

// Pages

async fn home(State(state): State<AppState>) -> PageResult {
    let chrome = chrome(&state)?;
    let hero = singleton(&state, "home", "hero")?;
    let meta = meta(&state, &chrome, "/", "", &describe(&hero, &chrome.tagline));
    let catalog = service_catalog(&state)?;
    let cards: Vec<TestimonialCard> = testimonials(&state)?.iter().map(TestimonialCard::from).collect();

    render(&HomeTemplate {
        meta,
        hero,
        journey: singleton(&state, "home", "journey")?,
        stats: collection(&state, "home", "stats")?,
        features: collection(&state, "home", "features")?,
        cta: singleton(&state, "home", "cta")?,
        services: catalog.services.iter().take(6).map(PostCard::from_service).collect(),
        posts: published_blog(&state, 3)?.iter().map(PostCard::from_blog).collect(),
        testimonials: carousel_items(&cards, CAROUSEL_MIN_ITEMS),
        chrome,
    })
}

async fn about(State(state): State<AppState>) -> PageResult {
    let chrome = chrome(&state)?;
    let hero = singleton(&state, "about", "hero")?;
    let meta = meta(&state, &chrome, "/about", "About", &describe(&hero, &chrome.tagline));
    render(&AboutTemplate {
        meta,
        hero,
        journey: singleton(&state, "about", "journey")?,
        philosophy: singleton(&state, "about", "philosophy")?,
        principles: collection(&state, "about", "principles")?,
        team: collection(&state, "about", "team")?,
        cta: singleton(&state, "about", "cta")?,
        chrome,
    })
}

async fn services_index(State(state): State<AppState>) -> PageResult {
    let chrome = chrome(&state)?;
    let hero = singleton(&state, "services", "hero")?;
    let meta = meta(&state, &chrome, "/services", "Services", &describe(&hero, &chrome.tagline));
    let catalog = service_catalog(&state)?;

    let groups = catalog
        .categories
        .iter()
        .map(|category| CategoryGroup {
            category: category.clone(),
            services: catalog
                .services
                .iter()
                .filter(|s| s.category_id == Some(category.id))
                .map(PostCard::from_service)
                .collect(),
        })
        .filter(|g| !g.services.is_empty())
        .collect();
    let uncategorized = catalog
        .services
        .iter()
        .filter(|s| match s.category_id {
            None => true,
            Some(id) => !catalog.categories.iter().any(|c| c.id == id),
        })
        .map(PostCard::from_service)
        .collect();

    render(&ServicesTemplate {
        meta,
        hero,
        process: collection(&state, "services", "process")?,
        features: collection(&state, "services", "features")?,
        cta: singleton(&state, "services", "cta")?,
        groups,
        uncategorized,
        chrome,
    })
}

async fn service_detail(State(state): State<AppState>, Path(slug): Path<String>) -> PageResult {
    let catalog = service_catalog(&state)?;
    let Some(service) = catalog.services.iter().find(|s| s.slug == slug).cloned() else {
        return not_found_page(&state);
    };
    let chrome = chrome(&state)?;
    let description = service.excerpt.clone().unwrap_or_else(|| chrome.tagline.clone());
    let meta = meta(&state, &chrome, &format!("/services/{slug}"), &service.title, &description);
    let testimonials = testimonials(&state)?
        .iter()
        .filter(|t| t.service_ids.contains(&service.id))
        .map(TestimonialCard::from)
        .collect();
    let related = catalog
        .services
        .iter()
        .filter(|s| s.id != service.id && s.category_id.is_some() && s.category_id == service.category_id)
        .take(3)
        .map(PostCard::from_service)
        .collect();

    render(&ServiceDetailTemplate {
        meta,
        date: format_date(&service.published_at.unwrap_or(service.created_at)),
        service,
        testimonials,
        related,
        chrome,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct BlogIndexParams {
    pub page: Option<usize>,
    pub category: Option<String>,
    pub search: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct BlogIndexData {
    posts: Vec<BlogPost>,
    total: usize,
    categories: Vec<CategoryCount>,
}

fn blog_href(page: usize, category: &str, search: &str) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("page", &page.to_string());
    if !category.is_empty() {
        query.append_pair("category", category);
    }
    if !search.is_empty() {
        query.append_pair("search", search);
    }
    format!("/blog?{}", query.finish())
}

async fn blog_index(State(state): State<AppState>, Query(params): Query<BlogIndexParams>) -> PageResult {
    let category = params.category.unwrap_or_default().trim().to_string();
    let search = params.search.unwrap_or_default().trim().to_string();
    let page = Pagination::from_page(params.page, BLOG_INDEX_PAGE_SIZE);

    let load = || -> Result<BlogIndexData> {
        let query = BlogQuery {
            status: Some(PostStatus::Published),
            page,
            category: Some(category.clone()).filter(|c| !c.is_empty()),
            search: Some(search.clone()).filter(|s| !s.is_empty()),
            ..Default::default()
        };
        let (posts, total) = state.db.list_blog_posts(&query)?;
        Ok(BlogIndexData {
            posts,
            total,
            categories: aggregate_categories(&state.db.published_blog_tags()?),
        })
    };
    // Free-text searches are not cached, and neither are unknown categories
    // or pages past the end.
    let data = if search.is_empty() {
        let key = format!("{TAG_BLOG}|page={}&category={}", page.page(), category.to_lowercase());
        state.cache.get_or_load_if(&key, load, |data| {
            let known_category = category.is_empty()
                || data
                    .categories
                    .iter()
                    .any(|c| c.name.eq_ignore_ascii_case(&category) || c.slug.eq_ignore_ascii_case(&category));
            known_category && page.page() <= page.page_count(data.total)
        })?
    } else {
        load()?
    };

    let chrome = chrome(&state)?;
    let meta = meta(&state, &chrome, "/blog", "Blog", &chrome.tagline.clone());
    let current = page.page();
    let page_count = page.page_count(data.total);
    render(&BlogIndexTemplate {
        meta,
        posts: data.posts.iter().map(PostCard::from_blog).collect(),
        categories: data.categories,
        prev_href: (current > 1).then(|| blog_href(current - 1, &category, &search)),
        next_href: (current < page_count).then(|| blog_href(current + 1, &category, &search)),
        page: current,
        page_count,
        total: data.total,
        category,
        search,
        chrome,
    })
}

async fn blog_post(State(state): State<AppState>, Path(slug): Path<String>) -> PageResult {
    let post = state
        .db
        .get_blog_post_by_slug(&slug)?
        .filter(|p| p.status == PostStatus::Published);
    let Some(post) = post else {
        return not_found_page(&state);
    };

    let chrome = chrome(&state)?;
    let description = post.excerpt.clone().unwrap_or_else(|| chrome.tagline.clone());
    let meta = meta(&state, &chrome, &format!("/blog/{slug}"), &post.title, &description);
    let related = published_blog(&state, 4)?
        .iter()
        .filter(|p| p.id != post.id)
        .take(3)
        .map(PostCard::from_blog)
        .collect();
    render(&BlogPostTemplate {
        meta,
        date: format_date(&post.published_at.unwrap_or(post.created_at)),
        post,
        related,
        chrome,
    })
}

async fn faq(State(state): State<AppState>) -> PageResult {
    let chrome = chrome(&state)?;
    let hero = singleton(&state, "faq", "hero")?;
    let meta = meta(&state, &chrome, "/faq", "FAQ", &describe(&hero, &chrome.tagline));
    render(&FaqTemplate {
        meta,
        hero,
        items: collection(&state, "faq", "items")?,
        chrome,
    })
}

async fn terms(State(state): State<AppState>) -> PageResult {
    let chrome = chrome(&state)?;
    let hero = singleton(&state, "terms", "hero")?;
    let meta = meta(&state, &chrome, "/terms", "Terms", &describe(&hero, &chrome.tagline));
    render(&TermsTemplate {
        meta,
        hero,
        sections: collection(&state, "terms", "sections")?,
        chrome,
    })
}

fn contact_template(
    state: &AppState,
    values: ContactFormValues,
    error: Option<String>,
    success: Option<String>,
) -> Result<ContactTemplate> {
    let chrome = chrome(state)?;
    let hero = singleton(state, "contact", "hero")?;
    let meta = meta(state, &chrome, "/contact", "Contact", &describe(&hero, &chrome.tagline));
    let services = service_catalog(state)?.services.into_iter().map(|s| s.title).collect();
    Ok(ContactTemplate {
        meta,
        hero,
        info: singleton(state, "contact", "info")?,
        form: singleton(state, "contact", "form")?,
        services,
        values,
        error,
        success,
        chrome,
    })
}

async fn contact_page(State(state): State<AppState>) -> PageResult {
    render(&contact_template(&state, ContactFormValues::default(), None, None)?)
}

async fn contact_submit(State(state): State<AppState>, Form(input): Form<ContactInput>) -> PageResult {
    let values = ContactFormValues {
        name: input.name.clone().unwrap_or_default(),
        email: input.email.clone().unwrap_or_default(),
        phone: input.phone.clone().unwrap_or_default(),
        company: input.company.clone().unwrap_or_default(),
        service: input.service.clone().unwrap_or_default(),
        message: input.message.clone().unwrap_or_default(),
    };
    match record_submission(&state, input) {
        Ok(_) => {
            let form = singleton(&state, "contact", "form")?;
            let message = match form.text("success_message") {
                "" => "Thanks for reaching out. We will get back to you shortly.".to_string(),
                custom => custom.to_string(),
            };
            render(&contact_template(&state, ContactFormValues::default(), None, Some(message))?)
        }
        Err(CmsError::Validation(message)) => {
            let body = contact_template(&state, values, Some(message), None)?.render()?;
            Ok((StatusCode::BAD_REQUEST, Html(body)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// SEO

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Normalizes an exclusion entry to a site path (`blog/x/` → `/blog/x`).
fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

async fn sitemap(State(state): State<AppState>) -> PageResult {
    let seo = singleton(&state, "site", "seo")?;
    let excluded: Vec<String> = seo.list("sitemap_exclude").iter().map(|p| normalize_path(p)).collect();
    let base = state.config.site_url();

    let mut entries: Vec<(String, Option<String>)> = STATIC_PAGES.iter().map(|p| (p.to_string(), None)).collect();
    for post in all_published_blog(&state)? {
        entries.push((format!("/blog/{}", post.slug), Some(post.updated_at.format("%Y-%m-%d").to_string())));
    }
    for service in all_published_services(&state)? {
        entries.push((
            format!("/services/{}", service.slug),
            Some(service.updated_at.format("%Y-%m-%d").to_string()),
        ));
    }

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for (path, lastmod) in entries.iter().filter(|(p, _)| !excluded.contains(p)) {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", xml_escape(&format!("{base}{path}"))));
        if let Some(date) = lastmod {
            xml.push_str(&format!("    <lastmod>{date}</lastmod>\n"));
        }
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");

    Ok(([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], xml).into_response())
}

pub fn default_robots(site_url: &str) -> String {
    format!("User-agent: *\nAllow: /\nDisallow: /admin\nDisallow: /api\n\nSitemap: {site_url}/sitemap.xml\n")
}

async fn robots(State(state): State<AppState>) -> PageResult {
    let seo = singleton(&state, "site", "seo")?;
    let body = match seo.text("robots_txt").trim() {
        "" => default_robots(state.config.site_url()),
        custom => format!("{custom}\n"),
    };
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_paths_are_normalized() {
        assert_eq!(normalize_path("blog/draft-post/"), "/blog/draft-post");
        assert_eq!(normalize_path(" /terms "), "/terms");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn blog_links_keep_filters() {
        assert_eq!(blog_href(2, "SEO Tips", ""), "/blog?page=2&category=SEO+Tips");
        assert_eq!(blog_href(1, "", "a&b"), "/blog?page=1&search=a%26b");
    }

    #[test]
    fn default_robots_points_at_sitemap() {
        let robots = default_robots("https://agency.example");
        assert!(robots.contains("Disallow: /admin"));
        assert!(robots.contains("Disallow: /api"));
        assert!(robots.ends_with("Sitemap: https://agency.example/sitemap.xml\n"));
    }

    #[test]
    fn xml_escape_covers_markup() {
        assert_eq!(xml_escape("a&b<c>"), "a&amp;b&lt;c&gt;");
    }
}
