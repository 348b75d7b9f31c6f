//! Dry run over a JSON file of items: prints each readiness verdict and the
//! metadata that would be generated, without writing anything back.
//!
//! Usage: `seo_dry_run items.json [--force]`

use anyhow::{bail, Result};
use nexjob_seo::diagnostics::TracingSink;
use nexjob_seo::generator::{generate, SourceFields};
use nexjob_seo::readiness::{evaluate, site_name};
use nexjob_seo::{ContentStore, MemoryStore, SeoConfig};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: seo_dry_run <items.json> [--force]");
    };
    let force = args.any(|a| a == "--force");

    let cfg = SeoConfig::load_default()?;
    let store = MemoryStore::new(cfg.site_name.clone().unwrap_or_else(|| "NexJob".into()));
    store.load_items_from(&PathBuf::from(path))?;
    let site = site_name(&store, &cfg).await?;

    for item in store.snapshot() {
        let verdict = evaluate(&store, &cfg, &TracingSink, &item, force).await?;
        let src = SourceFields {
            kind: &item.kind,
            title: &item.title,
            body: &item.body,
            custom_fields: &item.custom_fields,
        };
        let meta = generate(&src, &cfg, &site);
        let slug = store.unique_slug(&meta.slug, item.id, &item.kind).await?;
        println!(
            "#{} [{:?}] needs_processing={}\n  title: {}\n  description: {}\n  slug: {}",
            item.id,
            verdict,
            verdict.needs_processing(),
            meta.title,
            meta.description,
            slug
        );
    }
    Ok(())
}
