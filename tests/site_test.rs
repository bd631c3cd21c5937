mod common;

use agency_cms::domain::Role;
use agency_cms::seed;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::setup;
use serde_json::json;

#[tokio::test]
async fn seeded_site_renders_every_public_page() {
    let t = setup();
    let report = seed::seed(&t.state.db, None).unwrap();
    assert!(report.total() > 0);

    for path in ["/", "/about", "/services", "/blog", "/faq", "/terms", "/contact"] {
        let (status, headers, body) = t.get(path).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"), "{path}");
        assert!(body.contains("</html>"), "{path}");
    }

    let (_, posts) = t.json(Method::GET, "/api/blog?limit=1", None, None).await;
    let slug = posts["data"][0]["slug"].as_str().unwrap().to_string();
    let (status, _, body) = t.get(&format!("/blog/{slug}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(posts["data"][0]["title"].as_str().unwrap()));

    let (_, services) = t.json(Method::GET, "/api/services?limit=1", None, None).await;
    let slug = services["data"][0]["slug"].as_str().unwrap().to_string();
    let (status, _, _) = t.get(&format!("/services/{slug}")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn empty_site_still_renders_and_unknown_paths_get_the_404_page() {
    let t = setup();
    let (status, _, body) = t.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Our Agency"));

    let (status, _, body) = t.get("/no/such/page").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("</html>"));

    let (status, _, _) = t.get("/blog/missing-post").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn writes_invalidate_cached_pages() {
    let t = setup();
    let cookie = t.login_as("admin@example.com", Role::Admin);

    let (_, _, before) = t.get("/").await;
    assert!(!before.contains("Stories that sell"));

    let (status, _) = t
        .json(Method::PUT, "/api/pages/home/hero", Some(&cookie), Some(json!({ "title": "Stories that sell" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, _, after) = t.get("/").await;
    assert!(after.contains("Stories that sell"));
}

#[tokio::test]
async fn blog_index_caches_only_real_pages_and_categories() {
    let t = setup();
    seed::seed(&t.state.db, None).unwrap();
    let (status, _, _) = t.get("/blog").await;
    assert_eq!(status, StatusCode::OK);
    let baseline = t.state.cache.len();

    for i in 0..50 {
        let (status, _, _) = t.get(&format!("/blog?category=junk{i}")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _, _) = t.get(&format!("/blog?page={}", 1000 + i)).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _, _) = t.get(&format!("/blog?page={}", usize::MAX)).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(t.state.cache.len(), baseline);
}

#[tokio::test]
async fn sitemap_lists_published_content_minus_exclusions() {
    let t = setup();
    let cookie = t.login_as("admin@example.com", Role::Admin);
    for (title, status) in [("Visible", "published"), ("Hidden", "draft")] {
        let (code, _) = t
            .json(
                Method::POST,
                "/api/blog",
                Some(&cookie),
                Some(json!({ "title": title, "content": "body", "status": status })),
            )
            .await;
        assert_eq!(code, StatusCode::CREATED);
    }

    let (status, headers, xml) = t.get("/sitemap.xml").await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("application/xml"));
    assert!(xml.contains("<loc>http://localhost:3000/blog/visible</loc>"));
    assert!(!xml.contains("/blog/hidden"));
    assert!(xml.contains("<loc>http://localhost:3000/faq</loc>"));

    let (status, _) = t
        .json(
            Method::PUT,
            "/api/pages/site/seo",
            Some(&cookie),
            Some(json!({ "sitemap_exclude": ["faq/"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, _, xml) = t.get("/sitemap.xml").await;
    assert!(!xml.contains("<loc>http://localhost:3000/faq</loc>"));
    assert!(xml.contains("<loc>http://localhost:3000/terms</loc>"));
}

#[tokio::test]
async fn robots_txt_defaults_and_overrides() {
    let t = setup();
    let (status, _, body) = t.get("/robots.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Sitemap: http://localhost:3000/sitemap.xml"));

    let cookie = t.login_as("admin@example.com", Role::Admin);
    t.json(
        Method::PUT,
        "/api/pages/site/seo",
        Some(&cookie),
        Some(json!({ "robots_txt": "User-agent: *\nDisallow: /" })),
    )
    .await;
    let (_, _, body) = t.get("/robots.txt").await;
    assert_eq!(body, "User-agent: *\nDisallow: /\n");
}

async fn post_form(t: &common::TestApp, uri: &str, form: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    let (status, _, bytes) = t.send(request).await;
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::test]
async fn contact_page_form_confirms_or_echoes_errors() {
    let t = setup();
    let (status, body) = post_form(&t, "/contact", "name=Ada&email=ada%40example.com&message=Hello+there").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Thanks for reaching out"));
    assert_eq!(t.state.db.count_unread_contact_submissions().unwrap(), 1);

    let (status, body) = post_form(&t, "/contact", "name=Grace&message=Hello").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("email is required"));
    assert!(body.contains("Grace"));
}

#[tokio::test]
async fn back_office_redirects_anonymous_visitors() {
    let t = setup();
    for path in ["/admin", "/admin/blog", "/admin/pages/home/hero"] {
        let (status, headers, _) = t.get(path).await;
        assert_eq!(status, StatusCode::SEE_OTHER, "{path}");
        assert_eq!(headers[header::LOCATION], "/admin/login");
    }

    let (status, _, body) = t.get("/admin/login").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Sign in"));

    t.login_as("admin@example.com", Role::Admin);
    let (status, body) = post_form(&t, "/admin/login", "email=admin%40example.com&password=nope").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Invalid email or password"));

    let (status, _) = post_form(
        &t,
        "/admin/login",
        &format!("email=admin%40example.com&password={}", common::TEST_PASSWORD),
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn back_office_editors_render_for_signed_in_users() {
    let t = setup();
    let editor = t.login_as("editor@example.com", Role::Editor);
    let page = |uri: &str| {
        Request::builder()
            .uri(uri)
            .header(header::COOKIE, editor.clone())
            .body(Body::empty())
            .unwrap()
    };

    let (status, _, body) = t.send(page("/admin")).await;
    assert_eq!(status, StatusCode::OK);
    let body = String::from_utf8_lossy(&body);
    assert!(body.contains("Blog posts"));
    assert!(!body.contains("/admin/users"));

    let (status, _, _) = t.send(page("/admin/pages/home/stats")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = t.send(page("/admin/services")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = t.send(page("/admin/users")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, headers, _) = t.send(page("/admin/seo")).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers[header::LOCATION], "/admin/pages/site/seo");
}
