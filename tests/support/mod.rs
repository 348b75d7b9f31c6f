// tests/support/mod.rs
//
// Shared builders and store wrappers for the integration suites.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use nexjob_seo::content::{ContentUpdate, NewContentItem};
use nexjob_seo::diagnostics::DiagnosticLog;
use nexjob_seo::{
    ContentId, ContentItem, ContentStore, MemoryStore, ProcessOutcome, ProcessedMarker, SaveHook,
    SeoConfig,
};

pub const SITE: &str = "NexJob";

pub fn job(id: ContentId, title: &str, company: &str, location: &str, body: &str) -> ContentItem {
    let mut custom_fields = BTreeMap::new();
    if !company.is_empty() {
        custom_fields.insert("company_name".to_string(), company.to_string());
    }
    if !location.is_empty() {
        custom_fields.insert("location".to_string(), location.to_string());
    }
    ContentItem {
        id,
        kind: "job-listing".to_string(),
        title: title.to_string(),
        body: body.to_string(),
        custom_fields,
        current_slug: format!("draft-{id}"),
        current_seo_title: String::new(),
        current_seo_description: String::new(),
        processed_marker: ProcessedMarker::Unset,
        processed_at: None,
        modified_at: Utc::now(),
    }
}

pub const BODY: &str =
    "<p>We are hiring a backend engineer. You will build APIs! Great benefits.</p><h2>Requirements</h2><ul><li>Rust</li></ul>";

pub fn store_with(items: Vec<ContentItem>) -> MemoryStore {
    let store = MemoryStore::new(SITE);
    for it in items {
        store.put(it);
    }
    store
}

pub fn log() -> DiagnosticLog {
    DiagnosticLog::with_capacity(1_000)
}

/// Delegates to a [`MemoryStore`] and fails selected operations for selected ids.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_get: HashSet<ContentId>,
    pub fail_title_write: HashSet<ContentId>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_get: HashSet::new(),
            fail_title_write: HashSet::new(),
        }
    }
}

#[async_trait::async_trait]
impl ContentStore for FlakyStore {
    async fn get(&self, id: ContentId) -> Result<Option<ContentItem>> {
        if self.fail_get.contains(&id) {
            return Err(anyhow!("disk on fire while reading {id}"));
        }
        self.inner.get(id).await
    }
    async fn site_name(&self) -> Result<String> {
        self.inner.site_name().await
    }
    async fn set_custom_field(&self, id: ContentId, name: &str, value: &str) -> Result<()> {
        self.inner.set_custom_field(id, name, value).await
    }
    async fn set_seo_title(&self, id: ContentId, title: &str) -> Result<()> {
        if self.fail_title_write.contains(&id) {
            return Err(anyhow!("title column locked"));
        }
        self.inner.set_seo_title(id, title).await
    }
    async fn set_seo_description(&self, id: ContentId, description: &str) -> Result<()> {
        self.inner.set_seo_description(id, description).await
    }
    async fn unique_slug(&self, candidate: &str, id: ContentId, kind: &str) -> Result<String> {
        self.inner.unique_slug(candidate, id, kind).await
    }
    async fn rename_slug(&self, id: ContentId, candidate: &str) -> Result<String> {
        self.inner.rename_slug(id, candidate).await
    }
    async fn set_processed_marker(
        &self,
        id: ContentId,
        marker: ProcessedMarker,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.inner.set_processed_marker(id, marker, at).await
    }
    async fn list_ids(
        &self,
        kinds: &[String],
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ContentId>> {
        self.inner.list_ids(kinds, offset, limit).await
    }
    async fn insert(&self, item: NewContentItem) -> Result<ContentId> {
        self.inner.insert(item).await
    }
    async fn update(&self, id: ContentId, update: ContentUpdate) -> Result<bool> {
        self.inner.update(id, update).await
    }
}

/// A store whose slug rename fires the save notification, like a host whose
/// rename goes through the regular "content changed" path.
pub struct NotifyingStore {
    pub inner: MemoryStore,
    pub hook: SaveHook,
    pub cfg: SeoConfig,
    pub sink: Arc<DiagnosticLog>,
    pub nested: Mutex<Vec<Option<ProcessOutcome>>>,
}

#[async_trait::async_trait]
impl ContentStore for NotifyingStore {
    async fn get(&self, id: ContentId) -> Result<Option<ContentItem>> {
        self.inner.get(id).await
    }
    async fn site_name(&self) -> Result<String> {
        self.inner.site_name().await
    }
    async fn set_custom_field(&self, id: ContentId, name: &str, value: &str) -> Result<()> {
        self.inner.set_custom_field(id, name, value).await
    }
    async fn set_seo_title(&self, id: ContentId, title: &str) -> Result<()> {
        self.inner.set_seo_title(id, title).await
    }
    async fn set_seo_description(&self, id: ContentId, description: &str) -> Result<()> {
        self.inner.set_seo_description(id, description).await
    }
    async fn unique_slug(&self, candidate: &str, id: ContentId, kind: &str) -> Result<String> {
        self.inner.unique_slug(candidate, id, kind).await
    }
    async fn rename_slug(&self, id: ContentId, candidate: &str) -> Result<String> {
        let slug = self.inner.rename_slug(id, candidate).await?;
        let nested = self
            .hook
            .on_save(self, &self.cfg, self.sink.as_ref(), id)
            .await;
        self.nested.lock().unwrap().push(nested);
        Ok(slug)
    }
    async fn set_processed_marker(
        &self,
        id: ContentId,
        marker: ProcessedMarker,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.inner.set_processed_marker(id, marker, at).await
    }
    async fn list_ids(
        &self,
        kinds: &[String],
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ContentId>> {
        self.inner.list_ids(kinds, offset, limit).await
    }
    async fn insert(&self, item: NewContentItem) -> Result<ContentId> {
        self.inner.insert(item).await
    }
    async fn update(&self, id: ContentId, update: ContentUpdate) -> Result<bool> {
        self.inner.update(id, update).await
    }
}
