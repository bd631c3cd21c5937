//! Server-rendered back-office. Every editor is a form bound to one JSON API
//! route; the page's inline script does the reads and writes.

use super::templates::{AdminDashboardTemplate, AdminEditorTemplate, AdminLink, AdminLoginTemplate, EditorField};
use super::AppState;
use crate::auth::{self, clear_session_cookie, session_cookie, MaybeAdmin};
use crate::domain::Role;
use crate::error::CmsError;
use crate::sections::{self, humanize, FieldKind, SectionDef, SECTIONS};
use askama::Template;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use tracing::{error, info};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", get(logout).post(logout))
        .route("/pages/:page/:section", get(section_editor))
        .route("/:resource", get(resource_editor))
}

const LOGIN_PATH: &str = "/admin/login";

/// Field of a back-office form for a relational resource.
struct FormField {
    name: &'static str,
    input: &'static str,
    required: bool,
    options: &'static [&'static str],
}

const fn field(name: &'static str, input: &'static str) -> FormField {
    FormField { name, input, required: false, options: &[] }
}

const fn required(name: &'static str, input: &'static str) -> FormField {
    FormField { name, input, required: true, options: &[] }
}

const fn select(name: &'static str, options: &'static [&'static str]) -> FormField {
    FormField { name, input: "select", required: false, options }
}

const STATUSES: &[&str] = &["draft", "published", "in-review"];

struct AdminResource {
    slug: &'static str,
    title: &'static str,
    description: &'static str,
    list_url: &'static str,
    create_url: &'static str,
    item_url: &'static str,
    /// Nested array to list instead of the top-level records.
    list_key: &'static str,
    columns: &'static [&'static str],
    singleton: bool,
    admin_only: bool,
    fields: &'static [FormField],
}

static RESOURCES: &[AdminResource] = &[
    AdminResource {
        slug: "blog",
        title: "Blog posts",
        description: "Articles shown on /blog. Only published posts are public.",
        list_url: "/api/blog?status=all&limit=100",
        create_url: "/api/blog",
        item_url: "/api/blog/{id}",
        list_key: "",
        columns: &["id", "title", "status", "published_at"],
        singleton: false,
        admin_only: false,
        fields: &[
            required("title", "text"),
            field("slug", "text"),
            field("excerpt", "textarea"),
            required("content", "textarea"),
            field("featured_image", "url"),
            field("tags", "lines"),
            select("status", STATUSES),
            field("is_featured", "checkbox"),
        ],
    },
    AdminResource {
        slug: "services",
        title: "Services",
        description: "Service pages under /services.",
        list_url: "/api/services?status=all&limit=100",
        create_url: "/api/services",
        item_url: "/api/services/{id}",
        list_key: "",
        columns: &["id", "title", "category_name", "status"],
        singleton: false,
        admin_only: false,
        fields: &[
            required("title", "text"),
            field("slug", "text"),
            field("excerpt", "textarea"),
            required("content", "textarea"),
            field("featured_image", "url"),
            field("icon", "text"),
            field("category_id", "number"),
            field("subcategory_id", "number"),
            select("status", STATUSES),
            field("display_order", "number"),
        ],
    },
    AdminResource {
        slug: "service-categories",
        title: "Service categories",
        description: "Groups on the services page.",
        list_url: "/api/services/categories?all=true",
        create_url: "/api/services/categories",
        item_url: "/api/services/categories/{id}",
        list_key: "",
        columns: &["id", "name", "slug", "display_order", "is_active"],
        singleton: false,
        admin_only: false,
        fields: &[
            required("name", "text"),
            field("slug", "text"),
            field("description", "textarea"),
            field("icon", "text"),
            field("display_order", "number"),
            field("is_active", "checkbox"),
        ],
    },
    AdminResource {
        slug: "service-subcategories",
        title: "Service subcategories",
        description: "Finer grouping inside a service category.",
        list_url: "/api/services/subcategories",
        create_url: "/api/services/subcategories",
        item_url: "/api/services/subcategories/{id}",
        list_key: "",
        columns: &["id", "category_id", "name", "slug", "is_active"],
        singleton: false,
        admin_only: false,
        fields: &[
            required("category_id", "number"),
            required("name", "text"),
            field("slug", "text"),
            field("description", "textarea"),
            field("display_order", "number"),
            field("is_active", "checkbox"),
        ],
    },
    AdminResource {
        slug: "testimonials",
        title: "Testimonials",
        description: "Client quotes. Link them to services by id to show them on service pages.",
        list_url: "/api/testimonial?all=true",
        create_url: "/api/testimonial",
        item_url: "/api/testimonial/{id}",
        list_key: "",
        columns: &["id", "name", "company", "rating", "is_active"],
        singleton: false,
        admin_only: false,
        fields: &[
            required("name", "text"),
            field("role", "text"),
            field("company", "text"),
            required("content", "textarea"),
            field("image_url", "url"),
            field("rating", "number"),
            field("display_order", "number"),
            field("is_active", "checkbox"),
            field("service_ids", "ids"),
        ],
    },
    AdminResource {
        slug: "navbar",
        title: "Navigation",
        description: "Header menu. Set a parent id to nest an item.",
        list_url: "/api/navbar?all=true",
        create_url: "/api/navbar",
        item_url: "/api/navbar/{id}",
        list_key: "",
        columns: &["id", "label", "href", "parent_id", "display_order", "is_active"],
        singleton: false,
        admin_only: false,
        fields: &[
            required("label", "text"),
            required("href", "text"),
            field("parent_id", "number"),
            field("display_order", "number"),
            field("is_active", "checkbox"),
            field("open_in_new_tab", "checkbox"),
        ],
    },
    AdminResource {
        slug: "footer",
        title: "Footer sections",
        description: "Link columns in the site footer.",
        list_url: "/api/footer-sections?all=true",
        create_url: "/api/footer-sections",
        item_url: "/api/footer-sections/{id}",
        list_key: "",
        columns: &["id", "title", "display_order", "is_active"],
        singleton: false,
        admin_only: false,
        fields: &[
            required("title", "text"),
            field("display_order", "number"),
            field("is_active", "checkbox"),
        ],
    },
    AdminResource {
        slug: "footer-links",
        title: "Footer links",
        description: "Links inside a footer section.",
        list_url: "/api/footer-sections?all=true",
        create_url: "/api/footer-sections/{section_id}/links",
        item_url: "/api/footer-links/{id}",
        list_key: "links",
        columns: &["id", "section_id", "label", "href", "is_active"],
        singleton: false,
        admin_only: false,
        fields: &[
            required("section_id", "number"),
            required("label", "text"),
            required("href", "text"),
            field("display_order", "number"),
            field("is_active", "checkbox"),
        ],
    },
    AdminResource {
        slug: "store-settings",
        title: "Store settings",
        description: "Site name, branding, contact details and default meta tags.",
        list_url: "/api/store-settings",
        create_url: "",
        item_url: "/api/store-settings",
        list_key: "",
        columns: &[],
        singleton: true,
        admin_only: false,
        fields: &[
            field("site_name", "text"),
            field("tagline", "text"),
            field("logo_url", "url"),
            field("favicon_url", "url"),
            field("contact_email", "email"),
            field("contact_phone", "text"),
            field("address", "textarea"),
            field("facebook_url", "url"),
            field("twitter_url", "url"),
            field("linkedin_url", "url"),
            field("instagram_url", "url"),
            field("meta_title", "text"),
            field("meta_description", "textarea"),
            field("footer_text", "text"),
        ],
    },
    AdminResource {
        slug: "users",
        title: "Users",
        description: "Back-office accounts. Leave the password blank to keep it.",
        list_url: "/api/users",
        create_url: "/api/users",
        item_url: "/api/users/{id}",
        list_key: "",
        columns: &["id", "name", "email", "role", "is_active"],
        singleton: false,
        admin_only: true,
        fields: &[
            required("name", "text"),
            required("email", "email"),
            field("password", "password"),
            select("role", &["editor", "admin"]),
            field("is_active", "checkbox"),
        ],
    },
    AdminResource {
        slug: "contact",
        title: "Contact submissions",
        description: "Messages sent through the contact form.",
        list_url: "/api/contact",
        create_url: "",
        item_url: "/api/contact/{id}",
        list_key: "",
        columns: &["id", "created_at", "name", "email", "service", "message", "is_read"],
        singleton: false,
        admin_only: false,
        fields: &[field("is_read", "checkbox")],
    },
];

fn find_resource(slug: &str) -> Option<&'static AdminResource> {
    RESOURCES.iter().find(|r| r.slug == slug)
}

fn input_for(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text => "text",
        FieldKind::LongText => "textarea",
        FieldKind::Url => "url",
        FieldKind::Number => "number",
        FieldKind::Bool => "checkbox",
        FieldKind::List => "lines",
    }
}

fn resource_fields(resource: &AdminResource) -> Vec<EditorField> {
    resource
        .fields
        .iter()
        .map(|f| EditorField {
            name: f.name.to_string(),
            label: humanize(f.name),
            input: f.input,
            required: f.required,
            options: f.options.to_vec(),
        })
        .collect()
}

fn section_fields(def: &SectionDef) -> Vec<EditorField> {
    let mut fields: Vec<EditorField> = def
        .fields
        .iter()
        .map(|f| EditorField {
            name: f.name.to_string(),
            label: humanize(f.name),
            input: input_for(f.kind),
            required: f.required,
            options: Vec::new(),
        })
        .collect();
    if !def.is_singleton() {
        for (name, input) in [("display_order", "number"), ("is_active", "checkbox")] {
            fields.push(EditorField {
                name: name.to_string(),
                label: humanize(name),
                input,
                required: false,
                options: Vec::new(),
            });
        }
    }
    fields
}

fn page<T: Template>(template: &T) -> Response {
    match template.render() {
        Ok(body) => Html(body).into_response(),
        Err(e) => {
            error!("Admin template failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

fn to_login() -> Response {
    Redirect::to(LOGIN_PATH).into_response()
}

async fn login_page(admin: MaybeAdmin) -> Response {
    if admin.is_admin() {
        return Redirect::to("/admin").into_response();
    }
    page(&AdminLoginTemplate {
        error: None,
        email: String::new(),
    })
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

async fn login_submit(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    match auth::login(&state, &form.email, &form.password) {
        Ok((user, token)) => {
            info!("{} signed in to the back-office", user.email);
            let cookie = session_cookie(&token, state.config.token_ttl_hours);
            ([(header::SET_COOKIE, cookie)], Redirect::to("/admin")).into_response()
        }
        Err(CmsError::Auth(_)) => {
            let body = AdminLoginTemplate {
                error: Some("Invalid email or password".to_string()),
                email: form.email,
            };
            (StatusCode::UNAUTHORIZED, page(&body)).into_response()
        }
        Err(e) => {
            error!("Login failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Login failed").into_response()
        }
    }
}

async fn logout() -> Response {
    ([(header::SET_COOKIE, clear_session_cookie())], Redirect::to(LOGIN_PATH)).into_response()
}

async fn dashboard(State(state): State<AppState>, MaybeAdmin(user): MaybeAdmin) -> Response {
    let Some(user) = user else {
        return to_login();
    };
    let is_admin = user.role == Role::Admin;

    let mut links: Vec<AdminLink> = SECTIONS
        .iter()
        .filter(|def| def.page != "site")
        .map(|def| AdminLink {
            title: def.title(),
            href: format!("/admin/pages/{}/{}", def.page, def.section),
            group: "Pages",
        })
        .collect();
    links.extend(
        RESOURCES
            .iter()
            .filter(|r| is_admin || !r.admin_only)
            .map(|r| AdminLink {
                title: r.title.to_string(),
                href: format!("/admin/{}", r.slug),
                group: "Content",
            }),
    );
    links.push(AdminLink {
        title: "SEO (robots.txt, sitemap)".to_string(),
        href: "/admin/seo".to_string(),
        group: "Content",
    });

    let unread_messages = state.db.count_unread_contact_submissions().unwrap_or_else(|e| {
        error!("Could not count unread messages: {}", e);
        0
    });
    page(&AdminDashboardTemplate {
        user_name: user.name,
        is_admin,
        unread_messages,
        links,
    })
}

async fn section_editor(MaybeAdmin(user): MaybeAdmin, Path((page_name, section)): Path<(String, String)>) -> Response {
    let Some(user) = user else {
        return to_login();
    };
    let Some(def) = sections::lookup(&page_name, &section) else {
        return (StatusCode::NOT_FOUND, "Unknown section").into_response();
    };
    let base = format!("/api/pages/{}/{}", def.page, def.section);
    let (list_url, create_url, item_url) = if def.is_singleton() {
        (base.clone(), String::new(), base)
    } else {
        (format!("{base}?all=true"), base.clone(), format!("{base}/{{id}}"))
    };
    let mut columns = vec!["id".to_string()];
    columns.extend(def.fields.iter().take(3).map(|f| f.name.to_string()));
    if !def.is_singleton() {
        columns.push("is_active".to_string());
    }
    page(&AdminEditorTemplate {
        user_name: user.name,
        title: def.title(),
        description: if def.is_singleton() {
            "One block on the page. Saving replaces the live content.".to_string()
        } else {
            "Ordered list of items. Lower display order comes first.".to_string()
        },
        list_url,
        create_url,
        item_url,
        list_key: String::new(),
        columns: columns.join(","),
        singleton: def.is_singleton(),
        can_create: !def.is_singleton(),
        fields: section_fields(def),
    })
}

async fn resource_editor(MaybeAdmin(user): MaybeAdmin, Path(slug): Path<String>) -> Response {
    let Some(user) = user else {
        return to_login();
    };
    if slug == "seo" {
        return Redirect::to("/admin/pages/site/seo").into_response();
    }
    let Some(resource) = find_resource(&slug) else {
        return (StatusCode::NOT_FOUND, "Unknown editor").into_response();
    };
    if resource.admin_only && user.role != Role::Admin {
        return (StatusCode::FORBIDDEN, "Only administrators can manage users").into_response();
    }
    page(&AdminEditorTemplate {
        user_name: user.name,
        title: resource.title.to_string(),
        description: resource.description.to_string(),
        list_url: resource.list_url.to_string(),
        create_url: resource.create_url.to_string(),
        item_url: resource.item_url.to_string(),
        list_key: resource.list_key.to_string(),
        columns: resource.columns.join(","),
        singleton: resource.singleton,
        can_create: !resource.singleton && !resource.create_url.is_empty(),
        fields: resource_fields(resource),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_resource_field_has_a_known_input() {
        const INPUTS: [&str; 10] = [
            "text", "textarea", "url", "email", "password", "number", "checkbox", "lines", "ids", "select",
        ];
        for resource in RESOURCES {
            for f in resource.fields {
                assert!(INPUTS.contains(&f.input), "{}.{}", resource.slug, f.name);
                assert_eq!(f.input == "select", !f.options.is_empty(), "{}.{}", resource.slug, f.name);
            }
        }
    }

    #[test]
    fn collection_sections_get_ordering_fields() {
        let stats = sections::lookup("home", "stats").unwrap();
        let names: Vec<String> = section_fields(stats).into_iter().map(|f| f.name).collect();
        assert!(names.contains(&"display_order".to_string()));
        let hero = sections::lookup("home", "hero").unwrap();
        assert!(section_fields(hero).iter().all(|f| f.name != "is_active"));
    }
}
