use std::{sync::Arc, time::Duration};

use cdio_common::error::Result;

use crate::metrics::{
    registry::{CounterMetric, GaugeMetric, HistogramMetric, MetricsRegistry},
    types::{NAMESPACE, build_fq_name},
};

/// Instrumentation of the exporter's own HTTP surface.
pub struct HttpMetrics {
    requests_total: Arc<CounterMetric>,
    request_duration_seconds: Arc<HistogramMetric>,
    requests_in_flight: Arc<GaugeMetric>,
}

impl HttpMetrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self> {
        let requests_total = registry.register_counter(
            &build_fq_name(NAMESPACE, "exporter", "http_requests_total"),
            "Total number of HTTP requests served by the exporter",
            &["method", "status"],
        )?;

        // Scrapes fan out to one upstream call per watch, hence the long tail.
        let request_duration_seconds = registry.register_histogram(
            &build_fq_name(NAMESPACE, "exporter", "http_request_duration_seconds"),
            "Duration of HTTP requests served by the exporter in seconds",
            &["method", "status"],
            &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
        )?;

        let requests_in_flight = registry.register_gauge(
            &build_fq_name(NAMESPACE, "exporter", "http_requests_in_flight"),
            "Number of HTTP requests currently being served by the exporter",
            &[],
        )?;

        Ok(Self {
            requests_total,
            request_duration_seconds,
            requests_in_flight,
        })
    }

    /// Marks a request as in flight until the returned guard is dropped, so a
    /// request whose future is cancelled still leaves the gauge.
    #[must_use]
    pub fn request_started(&self) -> InFlightGuard {
        self.requests_in_flight.inc(&[], 1);
        InFlightGuard {
            gauge: Arc::clone(&self.requests_in_flight),
        }
    }

    pub fn record_request(&self, method: &str, status: u16, duration: Duration) {
        let status_value = status.to_string();
        self.requests_total.inc_one(&[method, &status_value]);
        self.request_duration_seconds
            .observe(&[method, &status_value], duration.as_secs_f64());
    }
}

pub struct InFlightGuard {
    gauge: Arc<GaugeMetric>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.dec(&[], 1);
    }
}
