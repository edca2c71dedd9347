// src/metrics/mod.rs
// Prometheus metrics for the gateway, memory service, and recall worker.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::info;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static ACTIVE_STREAMS: AtomicU64 = AtomicU64::new(0);

pub fn init_metrics() {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    PROMETHEUS_HANDLE
        .set(handle)
        .expect("Prometheus handle already initialized");

    info!("Prometheus metrics initialized");
}

pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics not initialized".to_string(),
        ),
    }
}

/// A chat turn was admitted and began streaming.
pub fn stream_opened() {
    let count = ACTIVE_STREAMS.fetch_add(1, Ordering::SeqCst) + 1;
    gauge!("threadline_active_streams").set(count as f64);
    counter!("threadline_turns_total").increment(1);
}

pub fn stream_closed() {
    let count = ACTIVE_STREAMS.fetch_sub(1, Ordering::SeqCst) - 1;
    gauge!("threadline_active_streams").set(count as f64);
}

pub fn record_rate_limited() {
    counter!("threadline_rate_limited_total").increment(1);
}

pub fn record_backpressure() {
    counter!("threadline_backpressure_total").increment(1);
}

/// One context-gathering layer finished (or was cut by its deadline).
pub fn record_gather_layer(layer: &str, hit_deadline: bool, duration_seconds: f64) {
    let outcome = if hit_deadline { "timeout" } else { "ok" };
    counter!("threadline_gather_layer_total", "layer" => layer.to_string(), "outcome" => outcome)
        .increment(1);
    histogram!("threadline_gather_layer_duration_seconds", "layer" => layer.to_string())
        .record(duration_seconds);
}

pub fn record_memory_saved(tier: &str) {
    counter!("threadline_memories_saved_total", "tier" => tier.to_string()).increment(1);
}

pub fn record_memory_superseded() {
    counter!("threadline_memories_superseded_total").increment(1);
}

pub fn record_audit_run(triggered_by: &str, candidates_found: u64) {
    counter!("threadline_audits_total", "trigger" => triggered_by.to_string()).increment(1);
    counter!("threadline_audit_candidates_total").increment(candidates_found);
}

pub fn record_recall(source: &str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("threadline_recall_total", "source" => source.to_string(), "result" => result)
        .increment(1);
}

pub fn record_job_outcome(job_type: &str, success: bool) {
    let status = if success { "success" } else { "failed" };
    counter!("threadline_jobs_total", "job_type" => job_type.to_string(), "status" => status)
        .increment(1);
}

pub fn record_upstream_call(provider: &str, success: bool, duration_seconds: f64) {
    let status = if success { "success" } else { "error" };
    counter!("threadline_upstream_calls_total", "provider" => provider.to_string(), "status" => status)
        .increment(1);
    histogram!("threadline_upstream_duration_seconds", "provider" => provider.to_string())
        .record(duration_seconds);
}

/// RAII timer: records a histogram sample when dropped, win-or-lose.
pub struct StageTimer {
    start: Instant,
    name: &'static str,
}

impl StageTimer {
    pub fn new(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        histogram!("threadline_stage_duration_seconds", "stage" => self.name)
            .record(self.start.elapsed().as_secs_f64());
    }
}
