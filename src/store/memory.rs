// src/store/memory.rs
//! In-memory [`ContentStore`] used by the server binary and the test suites.
//!
//! Slug uniqueness follows the usual CMS convention: the first free slug of
//! `candidate`, `candidate-2`, `candidate-3`, ... among items of the same type.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::ContentStore;
use crate::content::{ContentId, ContentItem, ContentUpdate, NewContentItem, ProcessedMarker};
use crate::generator::SLUG_MAX_LEN;

#[derive(Debug, Default)]
struct Inner {
    items: BTreeMap<ContentId, ContentItem>,
    next_id: ContentId,
}

#[derive(Debug)]
pub struct MemoryStore {
    site_name: String,
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new(site_name: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            inner: RwLock::new(Inner {
                items: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Place an item verbatim (keeps its id, slug and SEO fields).
    pub fn put(&self, item: ContentItem) {
        let mut g = self.inner.write().unwrap_or_else(|p| p.into_inner());
        g.next_id = g.next_id.max(item.id + 1);
        g.items.insert(item.id, item);
    }

    pub fn snapshot(&self) -> Vec<ContentItem> {
        let g = self.inner.read().unwrap_or_else(|p| p.into_inner());
        g.items.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .items
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seed from a JSON array of items (same shape as `GET /items/{id}`).
    pub fn load_items_from(&self, path: &Path) -> Result<usize> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading items from {}", path.display()))?;
        let items: Vec<ContentItem> = serde_json::from_str(&data)
            .with_context(|| format!("parsing items from {}", path.display()))?;
        let n = items.len();
        for it in items {
            self.put(it);
        }
        Ok(n)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| anyhow!("store rwlock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| anyhow!("store rwlock poisoned"))
    }
}

fn with_item<T>(
    inner: &mut Inner,
    id: ContentId,
    f: impl FnOnce(&mut ContentItem) -> T,
) -> Result<T> {
    let item = inner
        .items
        .get_mut(&id)
        .ok_or_else(|| anyhow!("content item {id} not found"))?;
    Ok(f(item))
}

fn resolve_unique(inner: &Inner, candidate: &str, id: ContentId, kind: &str) -> String {
    let base = if candidate.is_empty() {
        id.to_string()
    } else {
        candidate.to_string()
    };
    let taken = |s: &str| {
        inner
            .items
            .values()
            .any(|it| it.id != id && it.kind == kind && it.current_slug == s)
    };
    if !taken(&base) {
        return base;
    }
    let mut n: u64 = 2;
    loop {
        let suffix = format!("-{n}");
        let room = SLUG_MAX_LEN.saturating_sub(suffix.len());
        let stem: String = base.chars().take(room).collect();
        let c = format!("{}{}", stem.trim_end_matches('-'), suffix);
        if !taken(&c) {
            return c;
        }
        n += 1;
    }
}

// Authoring changes always land after the last processing stamp.
fn modification_stamp(item: &ContentItem) -> DateTime<Utc> {
    let now = Utc::now();
    match item.processed_at {
        Some(at) if at >= now => at + Duration::microseconds(1),
        _ => now,
    }
}

#[async_trait::async_trait]
impl ContentStore for MemoryStore {
    async fn get(&self, id: ContentId) -> Result<Option<ContentItem>> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    async fn site_name(&self) -> Result<String> {
        Ok(self.site_name.clone())
    }

    async fn set_custom_field(&self, id: ContentId, name: &str, value: &str) -> Result<()> {
        let mut g = self.write()?;
        with_item(&mut g, id, |it| {
            it.custom_fields.insert(name.to_string(), value.to_string());
        })
    }

    async fn set_seo_title(&self, id: ContentId, title: &str) -> Result<()> {
        let mut g = self.write()?;
        with_item(&mut g, id, |it| it.current_seo_title = title.to_string())
    }

    async fn set_seo_description(&self, id: ContentId, description: &str) -> Result<()> {
        let mut g = self.write()?;
        with_item(&mut g, id, |it| {
            it.current_seo_description = description.to_string()
        })
    }

    async fn unique_slug(&self, candidate: &str, id: ContentId, kind: &str) -> Result<String> {
        let g = self.read()?;
        Ok(resolve_unique(&g, candidate, id, kind))
    }

    async fn rename_slug(&self, id: ContentId, candidate: &str) -> Result<String> {
        let mut g = self.write()?;
        let kind = g
            .items
            .get(&id)
            .map(|it| it.kind.clone())
            .ok_or_else(|| anyhow!("content item {id} not found"))?;
        let slug = resolve_unique(&g, candidate, id, &kind);
        with_item(&mut g, id, |it| it.current_slug = slug.clone())?;
        Ok(slug)
    }

    async fn set_processed_marker(
        &self,
        id: ContentId,
        marker: ProcessedMarker,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut g = self.write()?;
        with_item(&mut g, id, |it| {
            it.processed_marker = marker;
            it.processed_at = Some(at);
        })
    }

    async fn list_ids(
        &self,
        kinds: &[String],
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ContentId>> {
        let g = self.read()?;
        Ok(g.items
            .values()
            .filter(|it| kinds.iter().any(|k| k == &it.kind))
            .skip(offset)
            .take(limit)
            .map(|it| it.id)
            .collect())
    }

    async fn insert(&self, item: NewContentItem) -> Result<ContentId> {
        let mut g = self.write()?;
        let id = g.next_id;
        g.next_id += 1;
        let slug = resolve_unique(&g, &slug::slugify(&item.title), id, &item.kind);
        g.items.insert(
            id,
            ContentItem {
                id,
                kind: item.kind,
                title: item.title,
                body: item.body,
                custom_fields: item.custom_fields,
                current_slug: slug,
                current_seo_title: String::new(),
                current_seo_description: String::new(),
                processed_marker: ProcessedMarker::Unset,
                processed_at: None,
                modified_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn update(&self, id: ContentId, update: ContentUpdate) -> Result<bool> {
        let mut g = self.write()?;
        let Some(it) = g.items.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(title) = update.title {
            it.title = title;
        }
        if let Some(body) = update.body {
            it.body = body;
        }
        for (k, v) in update.custom_fields {
            if v.is_empty() {
                it.custom_fields.remove(&k);
            } else {
                it.custom_fields.insert(k, v);
            }
        }
        it.modified_at = modification_stamp(it);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_job(title: &str) -> NewContentItem {
        NewContentItem {
            kind: "job-listing".into(),
            title: title.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_unique_slugs() {
        let store = MemoryStore::new("NexJob");
        let a = store.insert(new_job("Backend Engineer")).await.unwrap();
        let b = store.insert(new_job("Backend Engineer")).await.unwrap();
        assert_ne!(a, b);
        let a_slug = store.get(a).await.unwrap().unwrap().current_slug;
        let b_slug = store.get(b).await.unwrap().unwrap().current_slug;
        assert_eq!(a_slug, "backend-engineer");
        assert_eq!(b_slug, "backend-engineer-2");
    }

    #[tokio::test]
    async fn unique_slug_ignores_self_and_other_types() {
        let store = MemoryStore::new("NexJob");
        let a = store.insert(new_job("Kasir")).await.unwrap();
        let post = store
            .insert(NewContentItem {
                kind: "post".into(),
                title: "Kasir".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(store.unique_slug("kasir", a, "job-listing").await.unwrap(), "kasir");
        assert_eq!(store.unique_slug("kasir", 99, "job-listing").await.unwrap(), "kasir-2");
        assert_eq!(store.unique_slug("kasir", post, "post").await.unwrap(), "kasir");
    }

    #[tokio::test]
    async fn suffixed_slug_stays_within_max_len() {
        let store = MemoryStore::new("NexJob");
        let long = "a".repeat(SLUG_MAX_LEN);
        let a = store.insert(new_job("x")).await.unwrap();
        store.rename_slug(a, &long).await.unwrap();
        let resolved = store.unique_slug(&long, 42, "job-listing").await.unwrap();
        assert_eq!(resolved.len(), SLUG_MAX_LEN);
        assert!(resolved.ends_with("-2"));
    }

    #[tokio::test]
    async fn update_merges_fields_and_bumps_modified() {
        let store = MemoryStore::new("NexJob");
        let id = store.insert(new_job("Kasir")).await.unwrap();
        let at = Utc::now() + Duration::seconds(30);
        store
            .set_processed_marker(id, ProcessedMarker::Incomplete, at)
            .await
            .unwrap();

        let mut cf = BTreeMap::new();
        cf.insert("location".to_string(), "Bandung".to_string());
        assert!(store
            .update(
                id,
                ContentUpdate {
                    custom_fields: cf,
                    ..Default::default()
                }
            )
            .await
            .unwrap());
        let it = store.get(id).await.unwrap().unwrap();
        assert_eq!(it.field("location"), "Bandung");
        assert!(it.modified_at > at);
        assert!(!it.is_parked_incomplete());

        assert!(!store.update(999, ContentUpdate::default()).await.unwrap());
    }
}
