// src/processor.rs
//! Apply/Persist: regenerate and store SEO metadata for one item.
//!
//! [`process_item`] returns a typed outcome or error and leaves logging to the
//! caller. Triggers go through [`SaveHook`], which guards against re-entry and
//! records failures as diagnostics instead of propagating them.

use chrono::Utc;
use metrics::counter;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::config::seo::{SeoConfig, FALLBACK_COMPANY, FALLBACK_LOCATION};
use crate::content::{ContentId, ProcessedMarker};
use crate::diagnostics::{Diagnostic, DiagnosticSink, Severity};
use crate::generator::{self, GeneratedMeta, SourceFields};
use crate::readiness::{self, missing_fields, Readiness};
use crate::store::ContentStore;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("content item {0} not found")]
    NotFound(ContentId),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ProcessError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessError::NotFound(_) => "not_found",
            ProcessError::Storage(_) => "storage",
        }
    }
}

/// Where a processing request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Trigger {
    pub cron: bool,
    pub force: bool,
}

impl Trigger {
    pub fn manual() -> Self {
        Self {
            cron: false,
            force: false,
        }
    }

    pub fn cron() -> Self {
        Self {
            cron: true,
            force: false,
        }
    }

    pub fn forced(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessOutcome {
    /// Type not in the allow-list.
    NotEligible,
    /// Item is already being processed further up the call stack.
    Reentrant,
    /// Readiness check said nothing to do (save trigger only).
    UpToDate,
    /// Required data missing after fallbacks; `marked` when the incomplete marker was written.
    Incomplete { missing: Vec<String>, marked: bool },
    Processed {
        #[serde(flatten)]
        meta: GeneratedMeta,
        forced: bool,
    },
}

/// Run the persist steps for `id`. Readiness is not consulted here; callers decide.
pub async fn process_item(
    store: &dyn ContentStore,
    cfg: &SeoConfig,
    sink: &dyn DiagnosticSink,
    id: ContentId,
    trigger: Trigger,
) -> Result<ProcessOutcome, ProcessError> {
    crate::metrics::ensure_metrics_described();

    let item = store.get(id).await?.ok_or(ProcessError::NotFound(id))?;

    // config may have changed since the caller looked at the item
    if !cfg.is_allowed_type(&item.kind) {
        sink.record(
            Diagnostic::new(Severity::Debug, "type not eligible for SEO processing")
                .item(id, item.title.clone())
                .with("type", item.kind.clone()),
        );
        return Ok(ProcessOutcome::NotEligible);
    }

    let mut fields = item.custom_fields.clone();
    let missing = missing_fields(&item.title, &fields, cfg);
    for (name, fallback) in [
        (&cfg.company_field, FALLBACK_COMPANY),
        (&cfg.location_field, FALLBACK_LOCATION),
    ] {
        if missing.iter().any(|m| m == name) {
            store.set_custom_field(id, name, fallback).await?;
            fields.insert(name.clone(), fallback.to_string());
            sink.record(
                Diagnostic::new(Severity::Info, "fallback value applied")
                    .item(id, item.title.clone())
                    .with("field", name.clone())
                    .with("value", fallback),
            );
        }
    }

    let missing = missing_fields(&item.title, &fields, cfg);
    if !missing.is_empty() {
        let marked = trigger.cron;
        if marked {
            store
                .set_processed_marker(id, ProcessedMarker::Incomplete, Utc::now())
                .await?;
        }
        counter!("seo_items_incomplete_total").increment(1);
        sink.record(
            Diagnostic::new(Severity::Warning, "required fields still missing after fallback")
                .item(id, item.title.clone())
                .with("missing_fields", missing.clone())
                .with("marked_incomplete", marked),
        );
        return Ok(ProcessOutcome::Incomplete { missing, marked });
    }

    let site = readiness::site_name(store, cfg).await?;
    let src = SourceFields {
        kind: &item.kind,
        title: &item.title,
        body: &item.body,
        custom_fields: &fields,
    };
    let mut meta = generator::generate(&src, cfg, &site);

    // system rename: resolves uniqueness and does not fire the save trigger
    meta.slug = store.rename_slug(id, &meta.slug).await?;
    store.set_seo_title(id, &meta.title).await?;
    if !meta.description.is_empty() {
        store.set_seo_description(id, &meta.description).await?;
    }
    store
        .set_processed_marker(id, ProcessedMarker::Complete, Utc::now())
        .await?;

    counter!("seo_items_processed_total").increment(1);
    sink.record(
        Diagnostic::new(Severity::Info, "SEO metadata generated")
            .item(id, item.title.clone())
            .with("seo_title", meta.title.clone())
            .with("seo_description", meta.description.clone())
            .with("slug", meta.slug.clone())
            .with("forced", trigger.force)
            .with("cron", trigger.cron),
    );

    Ok(ProcessOutcome::Processed {
        meta,
        forced: trigger.force,
    })
}

/// [`process_item`] with failures logged at error severity and swallowed.
pub async fn process_item_logged(
    store: &dyn ContentStore,
    cfg: &SeoConfig,
    sink: &dyn DiagnosticSink,
    id: ContentId,
    trigger: Trigger,
) -> Option<ProcessOutcome> {
    match process_item(store, cfg, sink, id, trigger).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            record_failure(sink, id, trigger, &e);
            None
        }
    }
}

pub fn record_failure(
    sink: &dyn DiagnosticSink,
    id: ContentId,
    trigger: Trigger,
    e: &ProcessError,
) {
    counter!("seo_process_errors_total").increment(1);
    sink.record(
        Diagnostic::new(Severity::Error, format!("SEO processing failed: {e:#}"))
            .item_id(id)
            .with("error_kind", e.kind())
            .with("cron", trigger.cron)
            .with("forced", trigger.force),
    );
}

/// Ids currently being processed through a [`SaveHook`].
#[derive(Debug, Default)]
struct InFlight {
    ids: Mutex<HashSet<ContentId>>,
}

struct InFlightGuard<'a> {
    owner: &'a InFlight,
    id: ContentId,
}

impl InFlight {
    fn enter(&self, id: ContentId) -> Option<InFlightGuard<'_>> {
        let mut ids = self.ids.lock().unwrap_or_else(|p| p.into_inner());
        ids.insert(id).then(|| InFlightGuard { owner: self, id })
    }

    fn contains(&self, id: ContentId) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&id)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut ids = self.owner.ids.lock().unwrap_or_else(|p| p.into_inner());
        ids.remove(&self.id);
    }
}

/// Manual-save entry point: readiness first, then processing in the manual context.
///
/// While an item is being processed, further save notifications for the same
/// item are ignored, so a store that does notify on rename cannot recurse.
#[derive(Debug, Default, Clone)]
pub struct SaveHook {
    in_flight: Arc<InFlight>,
}

impl SaveHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_processing(&self, id: ContentId) -> bool {
        self.in_flight.contains(id)
    }

    pub async fn on_save(
        &self,
        store: &dyn ContentStore,
        cfg: &SeoConfig,
        sink: &dyn DiagnosticSink,
        id: ContentId,
    ) -> Option<ProcessOutcome> {
        self.run(store, cfg, sink, id, Trigger::manual()).await
    }

    /// Ungated [`process_item`] under the same re-entrancy guard (manual API trigger).
    pub async fn process(
        &self,
        store: &dyn ContentStore,
        cfg: &SeoConfig,
        sink: &dyn DiagnosticSink,
        id: ContentId,
        trigger: Trigger,
    ) -> Result<ProcessOutcome, ProcessError> {
        let Some(_guard) = self.in_flight.enter(id) else {
            return Ok(ProcessOutcome::Reentrant);
        };
        process_item(store, cfg, sink, id, trigger).await
    }

    /// [`SaveHook::process`] with failures recorded and swallowed (batch).
    pub async fn process_logged(
        &self,
        store: &dyn ContentStore,
        cfg: &SeoConfig,
        sink: &dyn DiagnosticSink,
        id: ContentId,
        trigger: Trigger,
    ) -> Option<ProcessOutcome> {
        match self.process(store, cfg, sink, id, trigger).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                record_failure(sink, id, trigger, &e);
                None
            }
        }
    }

    /// Same as [`SaveHook::on_save`] with an explicit trigger (API, webhook).
    pub async fn run(
        &self,
        store: &dyn ContentStore,
        cfg: &SeoConfig,
        sink: &dyn DiagnosticSink,
        id: ContentId,
        trigger: Trigger,
    ) -> Option<ProcessOutcome> {
        let Some(_guard) = self.in_flight.enter(id) else {
            tracing::debug!(
                target: "seo",
                item_id = id,
                "save notification ignored while processing"
            );
            return Some(ProcessOutcome::Reentrant);
        };

        let item = match store.get(id).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                sink.record(
                    Diagnostic::new(Severity::Warning, "save for unknown item").item_id(id),
                );
                return None;
            }
            Err(e) => {
                sink.record(
                    Diagnostic::new(Severity::Error, format!("loading item failed: {e:#}"))
                        .item_id(id),
                );
                return None;
            }
        };

        match readiness::evaluate(store, cfg, sink, &item, trigger.force).await {
            // missing fields still go through processing: fallbacks apply there
            Ok(r) if r.needs_processing() || matches!(r, Readiness::MissingFields(_)) => {}
            Ok(Readiness::NotEligible) => return Some(ProcessOutcome::NotEligible),
            Ok(_) => return Some(ProcessOutcome::UpToDate),
            Err(e) => {
                sink.record(
                    Diagnostic::new(Severity::Error, format!("readiness check failed: {e:#}"))
                        .item(id, item.title.clone()),
                );
                return None;
            }
        }

        process_item_logged(store, cfg, sink, id, trigger).await
    }
}
