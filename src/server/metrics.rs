//! Prometheus metrics for the engine service
//!
//! Labels are bounded: endpoint names are route templates, error kinds and
//! data types are fixed sets. Experiment names are never used as labels.

use crate::model::DataType;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

pub struct Metrics {
    registry: Registry,
    requests_total: IntCounterVec,
    errors_total: IntCounterVec,
    analyses_total: IntCounterVec,
    request_duration: HistogramVec,
}

pub type SharedMetrics = Arc<Metrics>;

/// Create a registry with every splitlab metric registered
pub fn create_metrics() -> Result<SharedMetrics, prometheus::Error> {
    let registry = Registry::new();

    let requests_total = IntCounterVec::new(
        Opts::new("splitlab_requests_total", "Total engine API requests"),
        &["endpoint"],
    )?;
    let errors_total = IntCounterVec::new(
        Opts::new("splitlab_errors_total", "Failed engine API requests by error kind"),
        &["kind"],
    )?;
    let analyses_total = IntCounterVec::new(
        Opts::new(
            "splitlab_analyses_total",
            "Completed analyses by classified data type",
        ),
        &["data_type"],
    )?;
    let request_duration = HistogramVec::new(
        HistogramOpts::new(
            "splitlab_request_duration_seconds",
            "Engine API request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        &["endpoint"],
    )?;

    registry.register(Box::new(requests_total.clone()))?;
    registry.register(Box::new(errors_total.clone()))?;
    registry.register(Box::new(analyses_total.clone()))?;
    registry.register(Box::new(request_duration.clone()))?;

    Ok(Arc::new(Metrics {
        registry,
        requests_total,
        errors_total,
        analyses_total,
        request_duration,
    }))
}

impl Metrics {
    pub fn record_request(&self, endpoint: &str, duration_secs: f64) {
        self.requests_total.with_label_values(&[endpoint]).inc();
        self.request_duration
            .with_label_values(&[endpoint])
            .observe(duration_secs);
    }

    pub fn record_error(&self, kind: &str) {
        self.errors_total.with_label_values(&[kind]).inc();
    }

    pub fn record_analysis(&self, data_type: DataType) {
        self.analyses_total
            .with_label_values(&[data_type.as_str()])
            .inc();
    }

    /// Render all metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
