// src/batch/mod.rs
pub mod scheduler;

use anyhow::{Context, Result};
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::SeoConfig;
use crate::content::ContentId;
use crate::diagnostics::{Diagnostic, DiagnosticSink, Severity};
use crate::processor::{ProcessOutcome, SaveHook, Trigger};
use crate::readiness::{self, Readiness};
use crate::store::ContentStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub scanned: usize,
    pub processed: usize,
    pub incomplete: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Stopped early because `max_per_run` attempts were made.
    pub capped: bool,
}

impl BatchReport {
    pub fn attempts(&self) -> usize {
        self.processed + self.incomplete + self.failed
    }
}

/// Where the next capped run picks up, as an offset into the eligible id list.
///
/// Shared by every caller of [`run_batch`] in one process so a run that hits
/// `max_per_run` hands over to the next instead of rescanning the same head.
#[derive(Debug, Default)]
pub struct BatchCursor {
    next: AtomicUsize,
}

impl BatchCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.next.load(Ordering::Relaxed)
    }
}

enum Sweep {
    Skipped,
    Processed,
    Incomplete,
    Failed,
}

/// One cron-context pass over eligible items.
///
/// Starts where the last capped run stopped, wraps around to the first item
/// and scans each item at most once. Pages through ids `batch_size` at a time
/// and stops after `max_per_run` processing attempts (0 = no cap). A failing
/// item is counted and the run moves on; only a failure to list items aborts
/// the run.
pub async fn run_batch(
    store: &dyn ContentStore,
    cfg: &SeoConfig,
    sink: &dyn DiagnosticSink,
    hook: &SaveHook,
    cursor: &BatchCursor,
    force: bool,
) -> Result<BatchReport> {
    crate::metrics::ensure_metrics_described();
    let t0 = std::time::Instant::now();

    let start = cursor.position();
    let mut report = BatchReport::default();
    let mut offset = start;
    let mut wrapped = false;
    'pages: loop {
        // second lap stops where the first one began
        let limit = if wrapped {
            cfg.batch_size.min(start.saturating_sub(offset))
        } else {
            cfg.batch_size
        };
        if limit == 0 {
            break;
        }
        let ids = store
            .list_ids(&cfg.allowed_types, offset, limit)
            .await
            .context("listing items for seo batch")?;
        if ids.is_empty() {
            if wrapped || start == 0 {
                break;
            }
            wrapped = true;
            offset = 0;
            continue;
        }

        for id in ids {
            if cfg.max_per_run > 0 && report.attempts() >= cfg.max_per_run {
                report.capped = true;
                break 'pages;
            }
            offset += 1;
            report.scanned += 1;
            match sweep_one(store, cfg, sink, hook, id, force).await {
                Sweep::Skipped => report.skipped += 1,
                Sweep::Processed => report.processed += 1,
                Sweep::Incomplete => report.incomplete += 1,
                Sweep::Failed => report.failed += 1,
            }
        }
    }
    cursor
        .next
        .store(if report.capped { offset } else { 0 }, Ordering::Relaxed);

    let now = chrono::Utc::now().timestamp().max(0) as u64;
    counter!("seo_batch_runs_total").increment(1);
    histogram!("seo_batch_duration_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    gauge!("seo_batch_last_run_ts").set(now as f64);

    tracing::info!(
        target: "batch",
        scanned = report.scanned,
        processed = report.processed,
        incomplete = report.incomplete,
        skipped = report.skipped,
        failed = report.failed,
        capped = report.capped,
        resume_at = cursor.position(),
        "seo batch finished"
    );
    Ok(report)
}

async fn sweep_one(
    store: &dyn ContentStore,
    cfg: &SeoConfig,
    sink: &dyn DiagnosticSink,
    hook: &SaveHook,
    id: ContentId,
    force: bool,
) -> Sweep {
    let item = match store.get(id).await {
        Ok(Some(item)) => item,
        Ok(None) => return Sweep::Skipped,
        Err(e) => {
            sink.record(
                Diagnostic::new(Severity::Error, format!("batch: loading item failed: {e:#}"))
                    .item_id(id),
            );
            return Sweep::Failed;
        }
    };

    // settled (complete or parked incomplete) until the item changes or a forced run
    if !force && item.is_settled() {
        return Sweep::Skipped;
    }

    match readiness::evaluate(store, cfg, sink, &item, force).await {
        Ok(r) if r.needs_processing() || matches!(r, Readiness::MissingFields(_)) => {}
        Ok(_) => return Sweep::Skipped,
        Err(e) => {
            sink.record(
                Diagnostic::new(Severity::Error, format!("batch: readiness check failed: {e:#}"))
                    .item(id, item.title.clone()),
            );
            return Sweep::Failed;
        }
    }

    let trigger = Trigger::cron().forced(force);
    match hook.process_logged(store, cfg, sink, id, trigger).await {
        Some(ProcessOutcome::Processed { .. }) => Sweep::Processed,
        Some(ProcessOutcome::Incomplete { .. }) => Sweep::Incomplete,
        Some(_) => Sweep::Skipped,
        None => Sweep::Failed,
    }
}
