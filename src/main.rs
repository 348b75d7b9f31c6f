//! SEO automation service: binary entrypoint.
//! Boots the Axum HTTP server, the in-memory content store and the batch scheduler.

use std::path::PathBuf;
use std::sync::Arc;

use nexjob_seo::batch::scheduler::spawn_batch_scheduler;
use nexjob_seo::metrics::Metrics;
use nexjob_seo::{router, AppState, MemoryStore, SeoConfig};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const ENV_SEED_PATH: &str = "SEO_SEED_PATH";
const ENV_LOG_FORMAT: &str = "SEO_LOG_FORMAT";
const DEFAULT_SITE_NAME: &str = "NexJob";

/// Install a subscriber unless the runtime already did.
/// `SEO_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("seo=info,batch=info,webhook=info,warn"));

    let json = std::env::var(ENV_LOG_FORMAT)
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = SeoConfig::load_default()?;
    let site_name = cfg
        .site_name
        .clone()
        .unwrap_or_else(|| DEFAULT_SITE_NAME.to_string());

    let store = MemoryStore::new(site_name);
    if let Ok(p) = std::env::var(ENV_SEED_PATH) {
        let n = store.load_items_from(&PathBuf::from(p))?;
        tracing::info!(target: "seo", items = n, "seeded content store");
    }

    let metrics = Metrics::init(cfg.batch_interval_secs)?;
    let state = AppState::new(Arc::new(store), cfg);
    spawn_batch_scheduler(state.clone());

    let app = router(state).merge(metrics.router());
    Ok(app.into())
}
