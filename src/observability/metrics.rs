//! # Metrics Collection
//!
//! Prometheus counters for registration, login, token resolution and the annotation
//! lifecycle. Recording is a no-op until [`init_metrics`] has installed the exporter.

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};
use ::tracing::{info, warn};
use metrics::{counter, describe_counter, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};
use tokio::sync::RwLock;

/// Metrics recorder that tracks application metrics
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    pub fn new() -> Self {
        Self
    }

    /// Record a registration outcome (`success`, `duplicate`, `invalid`, `error`)
    pub fn record_registration(&self, status: &str) {
        counter!("auth_registrations_total", "status" => status.to_string()).increment(1);
    }

    /// Record a login outcome (`success`, `invalid_credentials`, `error`)
    pub fn record_login(&self, status: &str) {
        counter!("auth_logins_total", "status" => status.to_string()).increment(1);
    }

    /// Record a bearer token resolution outcome
    pub fn record_authentication(&self, status: &str) {
        counter!("auth_authentications_total", "status" => status.to_string()).increment(1);
    }

    pub fn record_annotation_saved(&self, curated: bool) {
        counter!("annotations_saved_total", "curated" => curated.to_string()).increment(1);
    }

    pub fn record_prediction(&self, status: &str) {
        counter!("annotation_predictions_total", "status" => status.to_string()).increment(1);
    }

    pub fn record_corrupt_read(&self) {
        counter!("annotation_corrupt_reads_total").increment(1);
    }

    fn describe(&self) {
        describe_counter!("auth_registrations_total", Unit::Count, "User registration attempts");
        describe_counter!("auth_logins_total", Unit::Count, "Password login attempts");
        describe_counter!(
            "auth_authentications_total",
            Unit::Count,
            "Bearer token resolutions on authenticated routes"
        );
        describe_counter!("annotations_saved_total", Unit::Count, "Annotation records persisted");
        describe_counter!(
            "annotation_predictions_total",
            Unit::Count,
            "Calls to the entity prediction service"
        );
        describe_counter!(
            "annotation_corrupt_reads_total",
            Unit::Count,
            "Stored annotation records whose payload failed to decode"
        );
    }
}

static METRICS: LazyLock<Arc<RwLock<Option<MetricsRecorder>>>> =
    LazyLock::new(|| Arc::new(RwLock::new(None)));

/// Install the Prometheus exporter when a metrics port is configured
pub async fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    let metrics_addr = match config.metrics_bind_address() {
        Some(addr) => addr,
        None => {
            info!("Metrics exporter disabled (metrics_port = 0)");
            return Ok(());
        }
    };

    let socket_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
        Error::config(format!("Invalid metrics bind address '{}': {}", metrics_addr, e))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", &config.service_name)
        .install()
        .map_err(|e| Error::config(format!("Failed to initialize metrics exporter: {}", e)))?;

    let recorder = MetricsRecorder::new();
    recorder.describe();
    {
        let mut metrics = METRICS.write().await;
        if metrics.is_some() {
            warn!("Metrics recorder initialized twice; keeping the first");
            return Ok(());
        }
        *metrics = Some(recorder);
    }

    info!(
        metrics_addr = %metrics_addr,
        service_name = %config.service_name,
        "Metrics collection initialized"
    );

    Ok(())
}

/// Get the global metrics recorder
pub async fn get_metrics() -> Option<MetricsRecorder> {
    METRICS.read().await.clone()
}

pub async fn record_registration(status: &str) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_registration(status);
    }
}

pub async fn record_login(status: &str) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_login(status);
    }
}

pub async fn record_authentication(status: &str) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_authentication(status);
    }
}

pub async fn record_annotation_saved(curated: bool) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_annotation_saved(curated);
    }
}

pub async fn record_prediction(status: &str) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_prediction(status);
    }
}

pub async fn record_corrupt_read() {
    if let Some(metrics) = get_metrics().await {
        metrics.record_corrupt_read();
    }
}
