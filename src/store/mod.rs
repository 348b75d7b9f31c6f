// src/store/mod.rs
pub mod memory;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::content::{ContentId, ContentItem, ContentUpdate, NewContentItem, ProcessedMarker};

pub use memory::MemoryStore;

/// Host persistence consumed by the SEO core.
///
/// Writes made through `set_*`/`rename_slug` are system writes: they do not bump
/// `modified_at` and must not emit the host's "content changed" notification.
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    async fn get(&self, id: ContentId) -> Result<Option<ContentItem>>;

    /// Site display name used in the title template.
    async fn site_name(&self) -> Result<String>;

    async fn set_custom_field(&self, id: ContentId, name: &str, value: &str) -> Result<()>;
    async fn set_seo_title(&self, id: ContentId, title: &str) -> Result<()>;
    async fn set_seo_description(&self, id: ContentId, description: &str) -> Result<()>;

    /// Collision-free slug for `candidate` among items of `kind`, ignoring `id` itself.
    async fn unique_slug(&self, candidate: &str, id: ContentId, kind: &str) -> Result<String>;

    /// Resolve `candidate` through [`ContentStore::unique_slug`] and store it.
    /// Returns the slug actually written.
    async fn rename_slug(&self, id: ContentId, candidate: &str) -> Result<String>;

    async fn set_processed_marker(
        &self,
        id: ContentId,
        marker: ProcessedMarker,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Ids of items whose type is in `kinds`, ascending, paged.
    async fn list_ids(&self, kinds: &[String], offset: usize, limit: usize)
        -> Result<Vec<ContentId>>;

    /// Authoring insert; the host assigns id and initial slug.
    async fn insert(&self, item: NewContentItem) -> Result<ContentId>;

    /// Authoring update; bumps `modified_at`. `Ok(false)` for an unknown id.
    async fn update(&self, id: ContentId, update: ContentUpdate) -> Result<bool>;
}
