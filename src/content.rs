// src/content.rs
//! Content items as seen by the SEO core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type ContentId = u64;

/// Outcome of the last processing attempt, persisted with the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessedMarker {
    #[default]
    Unset,
    Complete,
    /// Attempted, but required source data was missing.
    Incomplete,
}

impl ProcessedMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessedMarker::Unset => "unset",
            ProcessedMarker::Complete => "complete",
            ProcessedMarker::Incomplete => "incomplete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
    #[serde(default)]
    pub current_slug: String,
    #[serde(default)]
    pub current_seo_title: String,
    #[serde(default)]
    pub current_seo_description: String,
    #[serde(default)]
    pub processed_marker: ProcessedMarker,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    pub modified_at: DateTime<Utc>,
}

impl ContentItem {
    /// Field value, or "" when absent.
    pub fn field(&self, name: &str) -> &str {
        self.custom_fields.get(name).map(String::as_str).unwrap_or("")
    }

    /// True when the last marker write is not older than the last authoring change.
    pub fn is_settled(&self) -> bool {
        match (self.processed_marker, self.processed_at) {
            (ProcessedMarker::Unset, _) | (_, None) => false,
            (_, Some(at)) => at >= self.modified_at,
        }
    }

    /// True for an "incomplete" marker that no authoring change has superseded yet.
    pub fn is_parked_incomplete(&self) -> bool {
        match (self.processed_marker, self.processed_at) {
            (ProcessedMarker::Incomplete, Some(at)) => at >= self.modified_at,
            _ => false,
        }
    }
}

/// Authoring payload for a new item (webhook, API, host import).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewContentItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
}

/// Partial authoring update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    /// Merged into the stored fields; an empty value clears the field.
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
}
