use std::{sync::Arc, time::Instant};

use async_trait::async_trait;

use crate::metrics::{
    collector::{Collector, push_sample},
    types::{ConstMetric, MetricDescriptor, MetricType, NAMESPACE},
};

const NO_LABELS: [String; 0] = [];

/// Resource usage of the exporter process itself.
pub struct ProcessCollector {
    start_time: Instant,
    uptime_seconds: Arc<MetricDescriptor>,
    resident_memory_bytes: Arc<MetricDescriptor>,
    available_parallelism: Arc<MetricDescriptor>,
}

impl ProcessCollector {
    pub fn new() -> Self {
        let descriptor = |name: &str, help: &str| {
            Arc::new(MetricDescriptor::new(
                NAMESPACE,
                "exporter",
                name,
                help,
                MetricType::Gauge,
                &[],
            ))
        };

        Self {
            start_time: Instant::now(),
            uptime_seconds: descriptor("uptime_seconds", "Exporter process uptime in seconds"),
            resident_memory_bytes: descriptor(
                "resident_memory_bytes",
                "Resident memory size of the exporter process in bytes",
            ),
            available_parallelism: descriptor(
                "available_parallelism",
                "Number of threads the exporter runtime may use",
            ),
        }
    }
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for ProcessCollector {
    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![
            Arc::clone(&self.uptime_seconds),
            Arc::clone(&self.resident_memory_bytes),
            Arc::clone(&self.available_parallelism),
        ]
    }

    async fn collect(&self) -> Vec<ConstMetric> {
        let mut metrics = Vec::with_capacity(3);
        push_sample(
            &mut metrics,
            &self.uptime_seconds,
            self.start_time.elapsed().as_secs_f64(),
            &NO_LABELS,
        );

        if let Some(resident_bytes) = read_resident_memory_bytes() {
            push_sample(
                &mut metrics,
                &self.resident_memory_bytes,
                resident_bytes as f64,
                &NO_LABELS,
            );
        }

        if let Ok(parallelism) = std::thread::available_parallelism() {
            push_sample(
                &mut metrics,
                &self.available_parallelism,
                parallelism.get() as f64,
                &NO_LABELS,
            );
        }

        metrics
    }
}

#[cfg(target_os = "linux")]
fn read_resident_memory_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let kb = rest
                .split_whitespace()
                .next()
                .and_then(|value| value.parse::<u64>().ok())?;
            return kb.checked_mul(1024);
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn read_resident_memory_bytes() -> Option<u64> {
    None
}
