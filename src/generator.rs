// src/generator.rs
//! # Metadata Generator
//! Pure, deterministic rules for SEO title, meta description and URL slug.
//! No I/O; the readiness check and the persist step share these rules, so a
//! successful run converges in one pass.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::seo::{SeoConfig, JOB_LISTING_TYPE};

pub const SLUG_MAX_LEN: usize = 200;

/// Fields the rules read. Borrowed so the persist step can pass patched values.
#[derive(Debug, Clone, Copy)]
pub struct SourceFields<'a> {
    pub kind: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    pub custom_fields: &'a BTreeMap<String, String>,
}

impl<'a> SourceFields<'a> {
    fn field(&self, name: &str) -> &'a str {
        self.custom_fields
            .get(name)
            .map(String::as_str)
            .unwrap_or("")
    }

    fn is_job_listing(&self) -> bool {
        self.kind == JOB_LISTING_TYPE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedMeta {
    pub title: String,
    pub description: String,
    pub slug: String,
}

pub fn generate(src: &SourceFields<'_>, cfg: &SeoConfig, site_name: &str) -> GeneratedMeta {
    GeneratedMeta {
        title: generate_title(src, cfg, site_name),
        description: generate_description(src.body),
        slug: generate_slug(src, cfg),
    }
}

pub fn generate_title(src: &SourceFields<'_>, cfg: &SeoConfig, site_name: &str) -> String {
    if src.is_job_listing() {
        format!(
            "Lowongan Kerja {} {} di {} - {}",
            src.title,
            src.field(&cfg.company_field),
            src.field(&cfg.location_field),
            site_name
        )
    } else {
        format!("{} - {}", src.title, site_name)
    }
}

/// First one or two sentences of the body text preceding the first `<h2`.
pub fn generate_description(body: &str) -> String {
    let lead = match find_ascii_ci(body, "<h2") {
        Some(idx) => &body[..idx],
        None => body,
    };

    let text = strip_tags(lead);
    let text = text.trim_matches(is_ascii_space);
    if text.is_empty() {
        return String::new();
    }

    split_sentences(text)
        .into_iter()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn generate_slug(src: &SourceFields<'_>, cfg: &SeoConfig) -> String {
    let source = if src.is_job_listing() {
        format!(
            "{} {} {}",
            src.title,
            src.field(&cfg.company_field),
            src.field(&cfg.location_field)
        )
    } else {
        src.title.to_string()
    };
    slugify(&source)
}

/// Slug pipeline: lowercase, keep `[a-z0-9\s-]`, collapse whitespace, spaces to
/// hyphens, collapse hyphens, trim hyphens, cap at [`SLUG_MAX_LEN`].
pub fn slugify(input: &str) -> String {
    let mut out = slug_body(input);
    if out.len() > SLUG_MAX_LEN {
        // ASCII only at this point, byte index == char index
        out.truncate(SLUG_MAX_LEN);
        let trimmed = out.trim_end_matches('-').len();
        out.truncate(trimmed);
    }
    out
}

/// Everything except the length cap. Output matches `^[a-z0-9]+(-[a-z0-9]+)*$` or is empty.
pub fn slug_body(input: &str) -> String {
    let lowered = input.to_ascii_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_sep = false;
    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.push(c);
        } else if c == '-' || is_ascii_space(c) {
            // whitespace runs and hyphen runs both end up as a single '-'
            pending_sep = true;
        }
    }
    out
}

// `\s` without Unicode: space, \t, \n, \v, \f, \r. Shared by slugs and sentence splitting.
fn is_ascii_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    // ASCII lowercasing keeps byte offsets, so the index is valid in `haystack`
    haystack.to_ascii_lowercase().find(needle)
}

fn strip_tags(s: &str) -> String {
    static RE_BLOCKS: OnceCell<Regex> = OnceCell::new();
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_blocks = RE_BLOCKS.get_or_init(|| {
        Regex::new(r"(?is)<script[^>]*?>.*?</script>|<style[^>]*?>.*?</style>")
            .expect("script/style regex")
    });
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex"));

    let out = re_blocks.replace_all(s, "");
    re_tags.replace_all(&out, "").to_string()
}

/// Split after `.`, `!` or `?` when followed by ASCII whitespace; empty fragments dropped.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut iter = text.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let Some(&(next_i, next_c)) = iter.peek() else {
            break;
        };
        if !is_ascii_space(next_c) {
            continue;
        }
        out.push(&text[start..next_i]);
        start = next_i;
        while let Some(&(j, w)) = iter.peek() {
            if is_ascii_space(w) {
                iter.next();
                start = j + w.len_utf8();
            } else {
                break;
            }
        }
        debug_assert!(i < start);
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out.retain(|s| !s.is_empty());
    out
}
