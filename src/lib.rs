// src/lib.rs
// Public library surface for the server binary and integration tests.

pub mod api;
pub mod config;
pub mod content;
pub mod diagnostics;
pub mod generator;
pub mod metrics;
pub mod processor;
pub mod readiness;
pub mod store;

// Cron-context sweep + interval scheduler
pub mod batch;
// Inbound job payloads
pub mod webhook;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::SeoConfig;
pub use crate::content::{ContentId, ContentItem, ProcessedMarker};
pub use crate::processor::{process_item, ProcessError, ProcessOutcome, SaveHook, Trigger};
pub use crate::readiness::{needs_processing, Readiness};
pub use crate::store::{ContentStore, MemoryStore};
