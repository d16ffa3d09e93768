use std::sync::Arc;

use async_trait::async_trait;
use cdio_api::WatchGateway;
use cdio_common::WATCH_LABELS;
use tracing::debug;

use crate::metrics::{
    collector::{BaseCollector, Collector, WatchCache, log_fetch_failure, push_sample, watch_labels},
    types::{ConstMetric, MetricDescriptor, MetricType, NAMESPACE},
};

const COLLECTOR: &str = "watch";

pub struct WatchCollector {
    base: BaseCollector<WatchCache>,
    check_count: Arc<MetricDescriptor>,
    fetch_time: Arc<MetricDescriptor>,
    notification_alert_count: Arc<MetricDescriptor>,
    last_check_status: Arc<MetricDescriptor>,
}

impl WatchCollector {
    pub fn new(gateway: Arc<dyn WatchGateway>) -> Self {
        let descriptor = |name: &str, help: &str, metric_type: MetricType| {
            Arc::new(MetricDescriptor::new(
                NAMESPACE,
                "watch",
                name,
                help,
                metric_type,
                &WATCH_LABELS,
            ))
        };

        Self {
            base: BaseCollector::new(gateway, WatchCache::default()),
            // Counter upstream; exposed as-is, no deltas are tracked here.
            check_count: descriptor(
                "check_count",
                "Number of checks for a watch",
                MetricType::Counter,
            ),
            fetch_time: descriptor(
                "fetch_time",
                "Time it took to fetch the watch",
                MetricType::Gauge,
            ),
            notification_alert_count: descriptor(
                "notification_alert_count",
                "Number of notification alerts for a watch",
                MetricType::Gauge,
            ),
            last_check_status: descriptor(
                "last_check_status",
                "Status of the last check for a watch",
                MetricType::Gauge,
            ),
        }
    }

    pub async fn cached_watch_count(&self) -> usize {
        self.base.read().await.len()
    }
}

#[async_trait]
impl Collector for WatchCollector {
    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![
            Arc::clone(&self.check_count),
            Arc::clone(&self.fetch_time),
            Arc::clone(&self.notification_alert_count),
            Arc::clone(&self.last_check_status),
        ]
    }

    async fn collect(&self) -> Vec<ConstMetric> {
        let mut cache = self.base.lock().await;
        let gateway = self.base.gateway();
        let Some(watches) = cache.refresh(gateway, COLLECTOR).await else {
            return Vec::new();
        };
        debug!(watches = watches.len(), "collecting watch metrics");

        let mut metrics = Vec::with_capacity(watches.len() * 4);
        for id in watches.keys() {
            let detail = match gateway.get_watch_detail(id).await {
                Ok(detail) => detail,
                Err(err) => {
                    log_fetch_failure(COLLECTOR, id, &err);
                    continue;
                }
            };

            let Some(labels) = watch_labels(COLLECTOR, id, &detail) else {
                continue;
            };

            push_sample(&mut metrics, &self.check_count, detail.check_count as f64, &labels);
            push_sample(&mut metrics, &self.fetch_time, detail.fetch_time, &labels);
            push_sample(
                &mut metrics,
                &self.notification_alert_count,
                detail.notification_alert_count as f64,
                &labels,
            );
            push_sample(
                &mut metrics,
                &self.last_check_status,
                f64::from(detail.last_check_status),
                &labels,
            );
        }

        metrics
    }
}
