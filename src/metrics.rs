use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "seo_items_processed_total",
            "Items whose SEO metadata was regenerated."
        );
        describe_counter!(
            "seo_items_incomplete_total",
            "Processing attempts stopped by missing required fields."
        );
        describe_counter!(
            "seo_process_errors_total",
            "Processing attempts that failed in storage or generation."
        );
        describe_counter!("seo_batch_runs_total", "Completed batch runs.");
        describe_counter!(
            "seo_webhook_items_total",
            "Items created from webhook payloads."
        );
        describe_histogram!("seo_batch_duration_ms", "Batch run time in milliseconds.");
        describe_gauge!(
            "seo_batch_last_run_ts",
            "Unix ts when the SEO batch last ran."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the configured batch interval.
    pub fn init(batch_interval_secs: u64) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        ensure_metrics_described();
        gauge!("seo_batch_interval_secs").set(batch_interval_secs as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
