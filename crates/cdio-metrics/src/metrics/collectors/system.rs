use std::sync::Arc;

use async_trait::async_trait;
use cdio_api::WatchGateway;
use tracing::error;

use crate::metrics::{
    collector::{BaseCollector, Collector, push_sample},
    types::{ConstMetric, MetricDescriptor, MetricType, NAMESPACE},
};

pub struct SystemCollector {
    base: BaseCollector,
    queue_size: Arc<MetricDescriptor>,
    watch_count: Arc<MetricDescriptor>,
    overdue_count: Arc<MetricDescriptor>,
    uptime: Arc<MetricDescriptor>,
}

impl SystemCollector {
    pub fn new(gateway: Arc<dyn WatchGateway>) -> Self {
        let descriptor = |name: &str, help: &str| {
            Arc::new(MetricDescriptor::new(
                NAMESPACE,
                "system",
                name,
                help,
                MetricType::Gauge,
                &["version"],
            ))
        };

        Self {
            base: BaseCollector::new(gateway, ()),
            queue_size: descriptor(
                "queue_size",
                "Current changedetection.io instance queue size",
            ),
            watch_count: descriptor(
                "watch_count",
                "Current changedetection.io instance watch count",
            ),
            overdue_count: descriptor(
                "overdue_watch_count",
                "Current changedetection.io instance overdue watch count",
            ),
            uptime: descriptor("uptime", "Current changedetection.io instance system uptime"),
        }
    }
}

#[async_trait]
impl Collector for SystemCollector {
    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![
            Arc::clone(&self.queue_size),
            Arc::clone(&self.watch_count),
            Arc::clone(&self.overdue_count),
            Arc::clone(&self.uptime),
        ]
    }

    async fn collect(&self) -> Vec<ConstMetric> {
        let _guard = self.base.lock().await;

        let info = match self.base.gateway().get_system_info().await {
            Ok(info) => info,
            Err(err) => {
                error!(error = %err, "failed to fetch system info");
                return Vec::new();
            }
        };

        let labels = [info.version.clone()];
        let mut metrics = Vec::with_capacity(4);
        push_sample(&mut metrics, &self.queue_size, info.queue_size as f64, &labels);
        push_sample(&mut metrics, &self.watch_count, info.watch_count as f64, &labels);
        push_sample(
            &mut metrics,
            &self.overdue_count,
            info.overdue_watch_count() as f64,
            &labels,
        );
        push_sample(&mut metrics, &self.uptime, info.uptime, &labels);
        metrics
    }
}
