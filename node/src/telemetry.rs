// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::sync::OnceLock;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() {
    // 1. Initialize Tracing (Logs)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "wipecert_node=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Initialize Metrics (Prometheus)
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            // Store handle for /metrics endpoint
            if PROM_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
            }
        }
        Err(e) => {
            tracing::error!("Failed to install Prometheus recorder: {}. Metrics disabled.", e);
            return;
        }
    }

    metrics::describe_counter!("wipecert_certificates_issued_total", "Total number of certificates issued");
    metrics::describe_counter!("wipecert_certificates_revoked_total", "Total number of certificates revoked");
    metrics::describe_counter!("wipecert_mutations_rejected_total", "Mutations refused by the registry, by error kind");
    metrics::describe_histogram!("wipecert_event_commit_duration_seconds", "Time taken to commit an event");
    metrics::describe_histogram!("wipecert_replay_duration_seconds", "Time taken to replay the event log");
    metrics::describe_gauge!("wipecert_snapshot_size_bytes", "Size of the last saved snapshot in bytes");

    // Ensure at least one metric exists on startup
    metrics::gauge!("wipecert_node_up", 1.0);
}

/// Get the Prometheus handle to render metrics
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}
