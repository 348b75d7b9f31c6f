// tests/seo_metrics.rs
#![cfg(feature = "strict-metrics")]
mod support;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use nexjob_seo::batch::{run_batch, BatchCursor};
use nexjob_seo::metrics::Metrics;
use nexjob_seo::{SaveHook, SeoConfig};
use support::{job, log, store_with, BODY};

#[tokio::test]
async fn metrics_exposed_after_batch() {
    let metrics = Metrics::init(120).expect("recorder");

    let store = store_with(vec![
        job(1, "Backend Engineer", "Acme", "Jakarta", BODY),
        job(2, " ", "Acme", "Jakarta", BODY),
    ]);
    let cfg = SeoConfig::default();
    let r = run_batch(&store, &cfg, &log(), &SaveHook::new(), &BatchCursor::new(), false)
        .await
        .unwrap();
    assert_eq!(r.processed, 1);
    assert_eq!(r.incomplete, 1);

    let out = metrics.handle.render();
    for needle in [
        "seo_items_processed_total",
        "seo_items_incomplete_total",
        "seo_batch_runs_total",
        "seo_batch_duration_ms",
        "seo_batch_last_run_ts",
        "seo_batch_interval_secs 120",
    ] {
        assert!(out.contains(needle), "missing {needle} in:\n{out}");
    }

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let text = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    assert!(String::from_utf8_lossy(&text).contains("seo_items_processed_total"));
}
