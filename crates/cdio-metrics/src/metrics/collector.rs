use std::sync::Arc;

use async_trait::async_trait;
use cdio_api::WatchGateway;
use cdio_common::{CdioError, Watch, WatchSet, derive_labels};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, warn};

use crate::metrics::types::{ConstMetric, MetricDescriptor};

/// Two-phase contract invoked by the registry on every scrape.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Static descriptor enumeration. Never touches the network or any lock.
    fn describe(&self) -> Vec<Arc<MetricDescriptor>>;

    /// Produces this cycle's samples from scratch. Failures are contained
    /// inside the collector; a failed cycle yields fewer samples, never an error.
    async fn collect(&self) -> Vec<ConstMetric>;
}

/// Gateway handle plus the lock that serialises scrapes of one collector and
/// guards whatever state it keeps between them.
pub struct BaseCollector<S = ()> {
    gateway: Arc<dyn WatchGateway>,
    state: RwLock<S>,
}

impl<S> BaseCollector<S> {
    pub fn new(gateway: Arc<dyn WatchGateway>, state: S) -> Self {
        Self {
            gateway,
            state: RwLock::new(state),
        }
    }

    pub fn gateway(&self) -> &dyn WatchGateway {
        self.gateway.as_ref()
    }

    /// Held for the whole of `collect`.
    pub async fn lock(&self) -> RwLockWriteGuard<'_, S> {
        self.state.write().await
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, S> {
        self.state.read().await
    }
}

/// Last watch set a collector listed successfully.
#[derive(Debug, Default)]
pub struct WatchCache {
    watches: Option<WatchSet>,
}

impl WatchCache {
    /// Lists the current watches and replaces the cache with them. When the
    /// listing fails the previous set is returned instead; `None` means no
    /// listing has ever succeeded.
    pub async fn refresh(
        &mut self,
        gateway: &dyn WatchGateway,
        collector: &'static str,
    ) -> Option<&WatchSet> {
        match gateway.list_watches().await {
            Ok(watches) => self.watches = Some(watches),
            Err(err) => match &self.watches {
                Some(cached) => error!(
                    collector,
                    error = %err,
                    cached = cached.len(),
                    "failed to list watches, falling back to last known set"
                ),
                None => error!(collector, error = %err, "failed to list watches"),
            },
        }

        self.watches.as_ref()
    }

    pub fn len(&self) -> usize {
        self.watches.as_ref().map_or(0, |watches| watches.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn log_fetch_failure(collector: &'static str, watch_id: &str, err: &CdioError) {
    if err.is_not_found() {
        debug!(collector, watch_id = %watch_id, "watch vanished upstream, skipping");
    } else {
        error!(collector, watch_id = %watch_id, error = %err, "failed to fetch watch data");
    }
}

pub(crate) fn watch_labels(
    collector: &'static str,
    watch_id: &str,
    watch: &Watch,
) -> Option<Vec<String>> {
    match derive_labels(watch) {
        Ok(labels) => Some(labels),
        Err(err) => {
            warn!(collector, watch_id = %watch_id, error = %err, "watch cannot be labelled, skipping");
            None
        }
    }
}

pub(crate) fn push_sample(
    metrics: &mut Vec<ConstMetric>,
    descriptor: &Arc<MetricDescriptor>,
    value: f64,
    labels: &[String],
) {
    match ConstMetric::new(descriptor, value, labels) {
        Ok(metric) => metrics.push(metric),
        Err(err) => error!(metric = %descriptor.name, error = %err, "failed to build sample"),
    }
}
