use std::sync::Arc;

use async_trait::async_trait;
use cdio_api::WatchGateway;
use cdio_common::WATCH_LABELS;
use tracing::info;

use crate::metrics::{
    collector::{BaseCollector, Collector, WatchCache, log_fetch_failure, push_sample, watch_labels},
    types::{ConstMetric, MetricDescriptor, MetricType, NAMESPACE},
};

const COLLECTOR: &str = "price";

/// Exposes the latest price of every offer type watch.
pub struct PriceCollector {
    base: BaseCollector<WatchCache>,
    price: Arc<MetricDescriptor>,
}

impl PriceCollector {
    pub fn new(gateway: Arc<dyn WatchGateway>) -> Self {
        Self {
            base: BaseCollector::new(gateway, WatchCache::default()),
            price: Arc::new(MetricDescriptor::new(
                NAMESPACE,
                "watch",
                "price",
                "Current price of an offer type watch",
                MetricType::Gauge,
                &WATCH_LABELS,
            )),
        }
    }

    pub async fn cached_watch_count(&self) -> usize {
        self.base.read().await.len()
    }
}

#[async_trait]
impl Collector for PriceCollector {
    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![Arc::clone(&self.price)]
    }

    async fn collect(&self) -> Vec<ConstMetric> {
        let mut cache = self.base.lock().await;
        let gateway = self.base.gateway();
        let Some(watches) = cache.refresh(gateway, COLLECTOR).await else {
            return Vec::new();
        };
        info!(watches = watches.len(), "collecting price metrics");

        let mut metrics = Vec::with_capacity(watches.len());
        for (id, watch) in watches {
            let snapshot = match gateway.get_latest_price(id).await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    log_fetch_failure(COLLECTOR, id, &err);
                    continue;
                }
            };

            let Some(labels) = watch_labels(COLLECTOR, id, watch) else {
                continue;
            };

            push_sample(&mut metrics, &self.price, snapshot.price, &labels);
        }

        metrics
    }
}
