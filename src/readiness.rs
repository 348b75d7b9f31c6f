// src/readiness.rs
//! Readiness Evaluator: does a content item need SEO regeneration?
//!
//! Checks run in a fixed order and stop at the first decision. Missing source
//! data is checked before staleness, so an item with a newly emptied required
//! field is reported as not ready even when its SEO fields are stale.

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::SeoConfig;
use crate::content::ContentItem;
use crate::diagnostics::{Diagnostic, DiagnosticSink, Severity};
use crate::generator::{generate_slug, generate_title, SourceFields};
use crate::store::ContentStore;

pub const TITLE_FIELD: &str = "title";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "missing", rename_all = "snake_case")]
pub enum Readiness {
    NotEligible,
    Forced,
    MissingFields(Vec<String>),
    TitleStale,
    DescriptionMissing,
    SlugStale,
    UpToDate,
}

impl Readiness {
    pub fn needs_processing(&self) -> bool {
        matches!(
            self,
            Readiness::Forced
                | Readiness::TitleStale
                | Readiness::DescriptionMissing
                | Readiness::SlugStale
        )
    }
}

fn is_blank(v: &str) -> bool {
    v.trim().is_empty()
}

/// Names of empty required inputs: `title` first, then configured custom fields in order.
pub fn missing_fields(
    title: &str,
    custom_fields: &BTreeMap<String, String>,
    cfg: &SeoConfig,
) -> Vec<String> {
    let mut out = Vec::new();
    if is_blank(title) {
        out.push(TITLE_FIELD.to_string());
    }
    for name in &cfg.required_fields {
        let v = custom_fields.get(name).map(String::as_str).unwrap_or("");
        if is_blank(v) {
            out.push(name.clone());
        }
    }
    out
}

/// Site name used in titles: config override first, then the store.
pub async fn site_name(store: &dyn ContentStore, cfg: &SeoConfig) -> Result<String> {
    match cfg.site_name.as_deref() {
        Some(name) => Ok(name.to_string()),
        None => store.site_name().await,
    }
}

pub async fn evaluate(
    store: &dyn ContentStore,
    cfg: &SeoConfig,
    sink: &dyn DiagnosticSink,
    item: &ContentItem,
    force_reprocess: bool,
) -> Result<Readiness> {
    if !cfg.is_allowed_type(&item.kind) {
        return Ok(Readiness::NotEligible);
    }
    if force_reprocess {
        return Ok(Readiness::Forced);
    }

    let missing = missing_fields(&item.title, &item.custom_fields, cfg);
    if !missing.is_empty() {
        sink.record(
            Diagnostic::new(Severity::Warning, "required fields missing, SEO not generated")
                .item(item.id, item.title.clone())
                .with("missing_fields", missing.clone()),
        );
        return Ok(Readiness::MissingFields(missing));
    }

    let src = SourceFields {
        kind: &item.kind,
        title: &item.title,
        body: &item.body,
        custom_fields: &item.custom_fields,
    };

    let site = site_name(store, cfg).await?;
    let expected_title = generate_title(&src, cfg, &site);
    if item.current_seo_title.is_empty() || item.current_seo_title != expected_title {
        return Ok(Readiness::TitleStale);
    }

    if item.current_seo_description.is_empty() {
        return Ok(Readiness::DescriptionMissing);
    }

    let candidate = generate_slug(&src, cfg);
    let expected_slug = store.unique_slug(&candidate, item.id, &item.kind).await?;
    if item.current_slug != expected_slug {
        return Ok(Readiness::SlugStale);
    }

    Ok(Readiness::UpToDate)
}

pub async fn needs_processing(
    store: &dyn ContentStore,
    cfg: &SeoConfig,
    sink: &dyn DiagnosticSink,
    item: &ContentItem,
    force_reprocess: bool,
) -> Result<bool> {
    Ok(evaluate(store, cfg, sink, item, force_reprocess)
        .await?
        .needs_processing())
}
