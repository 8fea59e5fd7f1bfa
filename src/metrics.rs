use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the process-wide Prometheus recorder (first call only) and return its handle.
pub fn install() -> anyhow::Result<PrometheusHandle> {
    HANDLE
        .get_or_try_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .context("prometheus: install recorder")?;
            describe();
            Ok::<_, anyhow::Error>(handle)
        })
        .cloned()
}

fn describe() {
    describe_counter!(
        "ledger_ingest_batches_total",
        "Link batches accepted and stored."
    );
    describe_counter!(
        "ledger_ingest_domains_total",
        "Distinct canonical domains written across all batches."
    );
    describe_counter!(
        "ledger_ingest_rejected_total",
        "Batches discarded because at least one link was unrecognized."
    );
    describe_counter!("ledger_store_errors_total", "Failed store operations.");
    describe_counter!("ledger_query_total", "Range queries served.");
    describe_histogram!(
        "ledger_query_matched_buckets",
        "Buckets selected by a range query."
    );
}

/// Returns a router exposing `/metrics` in the Prometheus exposition format.
pub fn router(handle: PrometheusHandle) -> Router {
    Router::new().route(
        "/metrics",
        get(move || {
            let h = handle.clone();
            async move { h.render() }
        }),
    )
}

pub(crate) fn batch_stored(domains: usize) {
    counter!("ledger_ingest_batches_total").increment(1);
    counter!("ledger_ingest_domains_total").increment(domains as u64);
}

pub(crate) fn batch_rejected() {
    counter!("ledger_ingest_rejected_total").increment(1);
}

pub(crate) fn store_error() {
    counter!("ledger_store_errors_total").increment(1);
}

pub(crate) fn query_served(matched_buckets: usize) {
    counter!("ledger_query_total").increment(1);
    histogram!("ledger_query_matched_buckets").record(matched_buckets as f64);
}
