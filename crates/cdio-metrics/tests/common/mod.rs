#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use cdio_api::WatchGateway;
use cdio_common::{
    CdioError, PriceResponse, PriceSnapshot, Result, SystemInfo, Watch, WatchSet,
};
use cdio_metrics::metrics::{Collector, MetricsRegistry};

/// In-memory stand-in for a changedetection.io instance whose state can be
/// changed between scrapes.
#[derive(Default)]
pub struct FakeGateway {
    watches: Mutex<WatchSet>,
    price_bodies: Mutex<HashMap<String, String>>,
    missing_prices: Mutex<HashSet<String>>,
    failing_details: Mutex<HashSet<String>>,
    vanished_details: Mutex<HashSet<String>>,
    system_info: Mutex<Option<SystemInfo>>,
    prices_as_array: AtomicBool,
    list_fails: AtomicBool,
    list_delay: Mutex<Option<Duration>>,
    list_calls: AtomicUsize,
    lists_in_flight: AtomicUsize,
    max_lists_in_flight: AtomicUsize,
}

impl FakeGateway {
    pub fn new(watches: WatchSet) -> Arc<Self> {
        Arc::new(Self {
            watches: Mutex::new(watches),
            ..Self::default()
        })
    }

    pub fn insert(&self, id: String, watch: Watch) {
        self.watches.lock().unwrap().insert(id, watch);
    }

    pub fn remove(&self, id: &str) {
        self.watches.lock().unwrap().remove(id);
    }

    pub fn set_prices_as_array(&self, enabled: bool) {
        self.prices_as_array.store(enabled, Ordering::SeqCst);
    }

    /// Serves `body` verbatim from the latest price route of `id`.
    pub fn set_price_body(&self, id: &str, body: &str) {
        self.price_bodies
            .lock()
            .unwrap()
            .insert(id.to_string(), body.to_string());
    }

    /// Answers the latest price route of `id` with a 404.
    pub fn hide_price(&self, id: &str) {
        self.missing_prices.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_detail(&self, id: &str) {
        self.failing_details.lock().unwrap().insert(id.to_string());
    }

    /// Keeps `id` in the listing but answers its detail route with a 404, as
    /// when a watch is deleted between the list and the detail call.
    pub fn vanish_detail(&self, id: &str) {
        self.vanished_details.lock().unwrap().insert(id.to_string());
    }

    pub fn set_list_failure(&self, enabled: bool) {
        self.list_fails.store(enabled, Ordering::SeqCst);
    }

    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_system_info(&self, info: Option<SystemInfo>) {
        *self.system_info.lock().unwrap() = info;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn max_lists_in_flight(&self) -> usize {
        self.max_lists_in_flight.load(Ordering::SeqCst)
    }

    fn price_body(&self, id: &str) -> Result<String> {
        if self.missing_prices.lock().unwrap().contains(id) {
            return Err(CdioError::WatchNotFound(id.to_string()));
        }
        if let Some(body) = self.price_bodies.lock().unwrap().get(id) {
            return Ok(body.clone());
        }

        let price = self
            .watches
            .lock()
            .unwrap()
            .get(id)
            .ok_or_else(|| CdioError::WatchNotFound(id.to_string()))?
            .price
            .clone();

        let body = match price {
            Some(price) if self.prices_as_array.load(Ordering::SeqCst) => {
                serde_json::to_string(&vec![price])
            }
            Some(price) => serde_json::to_string(&price),
            None => serde_json::to_string(&Vec::<PriceSnapshot>::new()),
        };
        Ok(body.unwrap())
    }
}

#[async_trait]
impl WatchGateway for FakeGateway {
    async fn list_watches(&self) -> Result<WatchSet> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.lists_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_lists_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.lists_in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.list_fails.load(Ordering::SeqCst) {
            return Err(CdioError::Transport {
                path: "watch".to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(self.watches.lock().unwrap().clone())
    }

    async fn get_watch_detail(&self, id: &str) -> Result<Watch> {
        if self.failing_details.lock().unwrap().contains(id) {
            return Err(CdioError::UnexpectedStatus {
                path: format!("watch/{id}"),
                status: 500,
            });
        }
        if self.vanished_details.lock().unwrap().contains(id) {
            return Err(CdioError::WatchNotFound(id.to_string()));
        }
        self.watches
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| CdioError::WatchNotFound(id.to_string()))
    }

    async fn get_latest_price(&self, id: &str) -> Result<PriceSnapshot> {
        let body = self.price_body(id)?;
        serde_json::from_str::<PriceResponse>(&body)
            .map_err(|err| CdioError::Decode {
                path: format!("watch/{id}/history/latest"),
                message: err.to_string(),
            })?
            .into_snapshot(id)
    }

    async fn get_system_info(&self) -> Result<SystemInfo> {
        self.system_info
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| CdioError::Transport {
                path: "systeminfo".to_string(),
                message: "connection refused".to_string(),
            })
    }
}

pub fn new_test_item(
    title: &str,
    price: f64,
    currency: &str,
    check_count: u64,
    fetch_time: f64,
    alert_count: u64,
) -> (String, Watch) {
    (
        uuid::Uuid::new_v4().to_string(),
        Watch {
            title: title.to_string(),
            url: format!(
                "https://www.{}.org/",
                title.to_lowercase().replace(' ', "-")
            ),
            check_count,
            fetch_time,
            notification_alert_count: alert_count,
            last_check_status: 200,
            price: Some(PriceSnapshot {
                price,
                currency: currency.to_string(),
                availability: "InStock".to_string(),
            }),
            ..Watch::default()
        },
    )
}

/// Two watches, "Item 1" at 100 USD and "Item 2" at 200 USD. Returns the id of
/// the second one alongside the set.
pub fn collector_test_db() -> (String, WatchSet) {
    let (id1, watch1) = new_test_item("Item 1", 100.0, "USD", 20, 15.0, 10);
    let (id2, watch2) = new_test_item("Item 2", 200.0, "USD", 20, 15.0, 10);
    (id2.clone(), [(id1, watch1), (id2, watch2)].into())
}

pub fn registry_with(collector: Arc<dyn Collector>) -> MetricsRegistry {
    let registry = MetricsRegistry::new();
    registry.register_collector(collector).unwrap();
    registry
}

pub async fn sample_count(registry: &MetricsRegistry) -> usize {
    registry
        .gather()
        .await
        .iter()
        .map(|family| family.samples.len())
        .sum()
}
