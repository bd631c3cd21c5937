//! Small text and list helpers shared by the API handlers and the public pages.

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, WORDS_PER_MINUTE};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

const BLOCK_ELEMENTS: [&str; 16] = [
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "td", "blockquote",
    "section",
];

/// Lowercase ASCII slug: runs of anything but `[a-z0-9]` collapse into one `-`.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '-',
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<&str>>()
        .join("-")
}

/// Text content of an HTML fragment with whitespace collapsed.
pub fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());

    for node in fragment.tree.root().descendants() {
        match node.value() {
            Node::Element(el) if BLOCK_ELEMENTS.contains(&el.name()) => out.push(' '),
            Node::Text(text) => {
                let hidden = node
                    .parent()
                    .and_then(|p| p.value().as_element().map(|e| e.name()))
                    .map(|name| name == "script" || name == "style")
                    .unwrap_or(false);
                if !hidden {
                    out.push_str(&text.text);
                }
            }
            _ => {}
        }
    }

    WHITESPACE.replace_all(&out, " ").trim().to_string()
}

/// Plain-text excerpt of at most `max_chars` characters, cut on a word boundary.
pub fn excerpt(html: &str, max_chars: usize) -> String {
    let text = strip_html(html);
    if text.chars().count() <= max_chars {
        return text;
    }

    let cut: String = text.chars().take(max_chars).collect();
    let trimmed = match cut.rfind(' ') {
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut.as_str(),
    };
    format!("{}…", trimmed.trim_end_matches(|c: char| matches!(c, ',' | ';' | ':' | '.' | ' ')))
}

/// Estimated reading time in whole minutes, never less than one.
pub fn read_time_minutes(html: &str) -> i64 {
    let words = strip_html(html).split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as i64
}

/// Splits the comma-joined storage form into trimmed, case-insensitively unique tags.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut seen = Vec::<String>::new();
    let mut tags = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let key = tag.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            tags.push(tag.to_string());
        }
    }
    tags
}

pub fn join_tags(tags: &[String]) -> String {
    parse_tags(&tags.join(",")).join(",")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub name: String,
    pub slug: String,
    pub count: usize,
}

/// Counts tag usage across posts: most used first, ties by name.
pub fn aggregate_categories(tag_lists: &[Vec<String>]) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<String, CategoryCount> = BTreeMap::new();
    for tags in tag_lists {
        for tag in tags {
            counts
                .entry(tag.to_lowercase())
                .and_modify(|c| c.count += 1)
                .or_insert_with(|| CategoryCount {
                    name: tag.clone(),
                    slug: slugify(tag),
                    count: 1,
                });
        }
    }

    let mut out: Vec<CategoryCount> = counts.into_values().collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    out
}

/// Items for an infinitely scrolling marquee: repeated up to `min_len`, then doubled
/// so the second half picks up exactly where the first one ends.
pub fn carousel_items<T: Clone>(items: &[T], min_len: usize) -> Vec<T> {
    if items.is_empty() {
        return Vec::new();
    }
    let mut base = items.to_vec();
    while base.len() < min_len {
        base.extend_from_slice(items);
    }
    let mut doubled = base.clone();
    doubled.extend(base);
    doubled
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination::new(None, None)
    }
}

impl Pagination {
    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            // SQLite binds OFFSET as a signed 64-bit integer.
            offset: offset.unwrap_or(0).min(i64::MAX as usize),
        }
    }

    /// One-based page number for the public blog index.
    pub fn from_page(page: Option<usize>, page_size: usize) -> Self {
        let page = page.unwrap_or(1).max(1);
        Self::new(Some(page_size), Some(page.saturating_sub(1).saturating_mul(page_size)))
    }

    pub fn page(&self) -> usize {
        self.offset / self.limit + 1
    }

    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.limit).max(1)
    }
}

/// Display date such as "March 5, 2025".
pub fn format_date(ts: &DateTime<Utc>) -> String {
    ts.format("%B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Content Strategy: 2025 Edition! "), "content-strategy-2025-edition");
        assert_eq!(slugify("SEO & PPC"), "seo-ppc");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn strip_html_keeps_words_apart() {
        let html = "<h2>Title</h2><p>First <strong>bold</strong> line.</p><p>Second&nbsp;line</p><script>x()</script>";
        assert_eq!(strip_html(html), "Title First bold line. Second line");
    }

    #[test]
    fn excerpt_cuts_on_word_boundary() {
        let html = "<p>The quick brown fox jumps over the lazy dog</p>";
        assert_eq!(excerpt(html, 100), "The quick brown fox jumps over the lazy dog");
        assert_eq!(excerpt(html, 18), "The quick brown…");
    }

    #[test]
    fn read_time_rounds_up_with_floor_of_one() {
        assert_eq!(read_time_minutes(""), 1);
        let words = vec!["word"; 201].join(" ");
        assert_eq!(read_time_minutes(&format!("<p>{words}</p>")), 2);
        let words = vec!["word"; 400].join(" ");
        assert_eq!(read_time_minutes(&words), 2);
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        assert_eq!(parse_tags(" SEO, content ,,seo,Video "), vec!["SEO", "content", "Video"]);
        assert_eq!(join_tags(&["a ".to_string(), "b".to_string(), "A".to_string()]), "a,b");
    }

    #[test]
    fn categories_sorted_by_count_then_name() {
        let lists = vec![
            vec!["SEO".to_string(), "Content".to_string()],
            vec!["seo".to_string()],
            vec!["Analytics".to_string(), "Content".to_string(), "SEO".to_string()],
        ];
        let cats = aggregate_categories(&lists);
        let summary: Vec<(&str, usize)> = cats.iter().map(|c| (c.name.as_str(), c.count)).collect();
        assert_eq!(summary, vec![("SEO", 3), ("Content", 2), ("Analytics", 1)]);
        assert_eq!(cats[0].slug, "seo");
    }

    #[test]
    fn carousel_repeats_then_doubles() {
        assert!(carousel_items::<u8>(&[], 6).is_empty());
        assert_eq!(carousel_items(&[1, 2], 3), vec![1, 2, 1, 2, 1, 2, 1, 2]);
        assert_eq!(carousel_items(&[1, 2, 3], 2), vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn pagination_clamps_and_counts_pages() {
        let p = Pagination::new(Some(500), None);
        assert_eq!(p.limit, MAX_PAGE_SIZE);
        assert_eq!(Pagination::new(Some(0), Some(3)).limit, 1);

        let p = Pagination::from_page(Some(3), 9);
        assert_eq!(p.offset, 18);
        assert_eq!(p.page(), 3);
        assert_eq!(p.page_count(19), 3);
        assert_eq!(p.page_count(0), 1);
    }

    #[test]
    fn pagination_saturates_huge_pages_and_offsets() {
        let p = Pagination::from_page(Some(usize::MAX), 9);
        assert_eq!(p.offset, i64::MAX as usize);

        let p = Pagination::new(None, Some(usize::MAX));
        assert_eq!(p.offset, i64::MAX as usize);
        assert!(i64::try_from(p.offset).is_ok());
    }

    #[test]
    fn format_date_is_human_readable() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 5, 10, 0, 0).unwrap();
        assert_eq!(format_date(&ts), "March 5, 2025");
    }
}
