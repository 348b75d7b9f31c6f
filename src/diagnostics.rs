//! Bounded in-memory diagnostic log, mirrored into `tracing`.
//!
//! The SEO core only writes here; operators read it via `/debug/diagnostics`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::content::ContentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub ts: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ContentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_title: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            severity,
            message: message.into(),
            item_id: None,
            item_title: None,
            context: Map::new(),
        }
    }

    pub fn item(mut self, id: ContentId, title: impl Into<String>) -> Self {
        self.item_id = Some(id);
        self.item_title = Some(title.into());
        self
    }

    pub fn item_id(mut self, id: ContentId) -> Self {
        self.item_id = Some(id);
        self
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn record(&self, d: Diagnostic);
}

fn emit_tracing(d: &Diagnostic) {
    let ctx = Value::Object(d.context.clone());
    match d.severity {
        Severity::Debug => tracing::debug!(
            target: "seo", item_id = ?d.item_id, title = ?d.item_title, context = %ctx, "{}", d.message
        ),
        Severity::Info => tracing::info!(
            target: "seo", item_id = ?d.item_id, title = ?d.item_title, context = %ctx, "{}", d.message
        ),
        Severity::Warning => tracing::warn!(
            target: "seo", item_id = ?d.item_id, title = ?d.item_title, context = %ctx, "{}", d.message
        ),
        Severity::Error => tracing::error!(
            target: "seo", item_id = ?d.item_id, title = ?d.item_title, context = %ctx, "{}", d.message
        ),
    }
}

/// Sink that only forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, d: Diagnostic) {
        emit_tracing(&d);
    }
}

#[derive(Debug)]
pub struct DiagnosticLog {
    inner: Mutex<VecDeque<Diagnostic>>,
    cap: usize,
}

impl DiagnosticLog {
    // a panic while holding the lock leaves the buffer usable
    fn lock(&self) -> MutexGuard<'_, VecDeque<Diagnostic>> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.clamp(1, 10_000);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(cap)),
            cap,
        }
    }

    pub fn snapshot_last_n(&self, n: usize) -> Vec<Diagnostic> {
        let v = self.lock();
        let start = v.len().saturating_sub(n);
        v.iter().skip(start).cloned().collect()
    }

    /// Latest entries about one item, oldest first.
    pub fn for_item(&self, id: ContentId) -> Vec<Diagnostic> {
        let v = self.lock();
        v.iter().filter(|d| d.item_id == Some(id)).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for DiagnosticLog {
    fn record(&self, d: Diagnostic) {
        emit_tracing(&d);
        let mut v = self.lock();
        if v.len() >= self.cap {
            v.pop_front();
        }
        v.push_back(d);
    }
}
