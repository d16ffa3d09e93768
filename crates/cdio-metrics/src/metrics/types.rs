use std::sync::Arc;

use cdio_common::error::{CdioError, Result};

pub const NAMESPACE: &str = "changedetectionio";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

impl MetricType {
    pub fn as_prometheus_type(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
        }
    }
}

/// Static metadata of one metric family. Built once when a collector is
/// constructed and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub metric_type: MetricType,
    pub variable_labels: Vec<String>,
}

impl MetricDescriptor {
    pub fn new(
        namespace: &str,
        subsystem: &str,
        name: &str,
        help: &str,
        metric_type: MetricType,
        variable_labels: &[&str],
    ) -> Self {
        Self {
            name: build_fq_name(namespace, subsystem, name),
            help: help.to_string(),
            metric_type,
            variable_labels: variable_labels.iter().map(|label| (*label).to_string()).collect(),
        }
    }
}

/// Joins the non-empty parts with `_`, e.g. `changedetectionio_watch_price`.
pub fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }

    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Counter(f64),
    Gauge(f64),
    Histogram {
        buckets: Vec<(f64, u64)>,
        count: u64,
        sum: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub labels: Vec<(String, String)>,
    pub value: MetricValue,
}

#[derive(Debug, Clone)]
pub struct CollectedMetric {
    pub descriptor: MetricDescriptor,
    pub samples: Vec<MetricSample>,
}

/// One sample produced by a collector during a single scrape.
#[derive(Debug, Clone)]
pub struct ConstMetric {
    pub descriptor: Arc<MetricDescriptor>,
    pub sample: MetricSample,
}

impl ConstMetric {
    pub fn new<S: AsRef<str>>(
        descriptor: &Arc<MetricDescriptor>,
        value: f64,
        label_values: &[S],
    ) -> Result<Self> {
        if label_values.len() != descriptor.variable_labels.len() {
            return Err(CdioError::InvalidArgument(format!(
                "metric {} expects {} label values, got {}",
                descriptor.name,
                descriptor.variable_labels.len(),
                label_values.len()
            )));
        }

        let value = match descriptor.metric_type {
            MetricType::Counter => MetricValue::Counter(value),
            MetricType::Gauge => MetricValue::Gauge(value),
            MetricType::Histogram => {
                return Err(CdioError::InvalidArgument(format!(
                    "metric {} is a histogram and cannot carry a constant value",
                    descriptor.name
                )));
            }
        };

        Ok(Self {
            descriptor: Arc::clone(descriptor),
            sample: MetricSample {
                labels: descriptor
                    .variable_labels
                    .iter()
                    .zip(label_values.iter())
                    .map(|(name, value)| (name.clone(), value.as_ref().to_string()))
                    .collect(),
                value,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{ConstMetric, MetricDescriptor, MetricType, MetricValue, NAMESPACE, build_fq_name};

    #[test]
    fn fq_name_skips_empty_parts() {
        assert_eq!(
            build_fq_name(NAMESPACE, "watch", "price"),
            "changedetectionio_watch_price"
        );
        assert_eq!(build_fq_name("", "system", "uptime"), "system_uptime");
        assert_eq!(build_fq_name(NAMESPACE, "", "up"), "changedetectionio_up");
        assert_eq!(build_fq_name(NAMESPACE, "watch", ""), "");
    }

    #[test]
    fn const_metric_pairs_labels_with_values() {
        let descriptor = Arc::new(MetricDescriptor::new(
            NAMESPACE,
            "watch",
            "check_count",
            "Number of checks for a watch",
            MetricType::Counter,
            &["title", "source"],
        ));

        let metric = ConstMetric::new(&descriptor, 20.0, &["Item 1", "www.item-1.org"]).unwrap();
        assert_eq!(metric.sample.value, MetricValue::Counter(20.0));
        assert_eq!(
            metric.sample.labels,
            vec![
                ("title".to_string(), "Item 1".to_string()),
                ("source".to_string(), "www.item-1.org".to_string()),
            ]
        );
    }

    #[test]
    fn const_metric_rejects_label_mismatch() {
        let descriptor = Arc::new(MetricDescriptor::new(
            NAMESPACE,
            "system",
            "queue_size",
            "Current changedetection.io instance queue size",
            MetricType::Gauge,
            &["version"],
        ));

        assert!(ConstMetric::new(&descriptor, 1.0, &[] as &[&str]).is_err());
        assert!(ConstMetric::new(&descriptor, 1.0, &["a", "b"]).is_err());
    }
}
