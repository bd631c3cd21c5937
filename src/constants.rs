/// Cookie carrying the admin session token.
pub const AUTH_COOKIE: &str = "admin_token";

// Post lifecycle ids, as stored in `post_statuses`.
pub const STATUS_DRAFT: i64 = 1;
pub const STATUS_PUBLISHED: i64 = 2;
pub const STATUS_IN_REVIEW: i64 = 3;

// Cache tags for resources that are not page sections.
pub const TAG_BLOG: &str = "blog";
pub const TAG_SERVICES: &str = "services";
pub const TAG_NAVBAR: &str = "navbar";
pub const TAG_FOOTER: &str = "footer";
pub const TAG_STORE_SETTINGS: &str = "store-settings";
pub const TAG_TESTIMONIALS: &str = "testimonials";

/// Upper bound on cached page-data entries.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;
pub const BLOG_INDEX_PAGE_SIZE: usize = 9;
pub const EXCERPT_CHARS: usize = 160;
pub const WORDS_PER_MINUTE: usize = 200;

/// Minimum number of cards in the testimonial marquee before it is doubled.
pub const CAROUSEL_MIN_ITEMS: usize = 6;

/// Favicon sizes written into the derived `.ico`.
pub const FAVICON_SIZES: [u32; 3] = [16, 32, 48];

pub const ALLOWED_UPLOAD_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "webp", "svg", "ico"];

/// Public paths that always appear in the sitemap.
pub const STATIC_PAGES: [&str; 7] = ["/", "/about", "/services", "/blog", "/faq", "/terms", "/contact"];

/// Cache tag for one page section.
pub fn section_tag(page: &str, section: &str) -> String {
    format!("pages:{page}:{section}")
}
