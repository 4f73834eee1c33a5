use metrics::{counter, gauge, histogram};
use rag_core::BuildReport;
use std::net::SocketAddr;

/// Metric emission for build, retrieval and provider events.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphRagTelemetry;

impl GraphRagTelemetry {
    pub fn new() -> Self {
        Self
    }

    pub fn record_build(&self, report: &BuildReport) {
        counter!("medrag_build_nodes_written_total").increment(report.written as u64);
        counter!("medrag_build_edges_total").increment(report.edges as u64);
        counter!("medrag_build_records_skipped_total", "reason" => "invalid")
            .increment(report.skipped_invalid as u64);
        counter!("medrag_build_records_skipped_total", "reason" => "duplicate")
            .increment(report.skipped_duplicate as u64);
        counter!("medrag_build_records_skipped_total", "reason" => "embedding")
            .increment(report.skipped_embedding as u64);
        gauge!("medrag_build_max_fan_out").set(report.max_fan_out as f64);
        histogram!("medrag_build_duration_seconds").record(report.duration_ms as f64 / 1000.0);
    }

    pub fn record_batch_skipped(&self, stage: &str) {
        counter!("medrag_build_batches_skipped_total", "stage" => stage.to_string()).increment(1);
    }

    pub fn record_retrieval(&self, seeds: usize, expanded: usize, edges: usize, duration_ms: f64) {
        counter!("medrag_retrievals_total").increment(1);
        histogram!("medrag_retrieval_seed_nodes").record(seeds as f64);
        histogram!("medrag_retrieval_expanded_nodes").record(expanded as f64);
        histogram!("medrag_retrieval_edges").record(edges as f64);
        histogram!("medrag_retrieval_duration_seconds").record(duration_ms / 1000.0);
    }

    pub fn record_store_failure(&self, operation: &str) {
        let labels = [("operation", operation.to_string())];
        counter!("medrag_store_failures_total", &labels).increment(1);
    }

    pub fn record_provider_failure(&self, provider: &str) {
        let labels = [("provider", provider.to_string())];
        counter!("medrag_llm_provider_failures_total", &labels).increment(1);
    }

    pub fn record_oracle_fallback(&self, reason: &str) {
        let labels = [("reason", reason.to_string())];
        counter!("medrag_oracle_fallbacks_total", &labels).increment(1);
    }

    pub fn record_agent_run(&self, iterations: usize, termination: &str) {
        counter!("medrag_agent_runs_total", "termination" => termination.to_string())
            .increment(1);
        histogram!("medrag_agent_iterations").record(iterations as f64);
    }
}

/// Installs the Prometheus exporter as the global recorder, serving on `addr`.
pub fn init_metrics_exporter(
    addr: SocketAddr
) -> Result<GraphRagTelemetry, Box<dyn std::error::Error + Send + Sync>> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    Ok(GraphRagTelemetry::new())
}
