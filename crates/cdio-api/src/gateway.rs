use async_trait::async_trait;
use cdio_common::{PriceSnapshot, Result, SystemInfo, Watch, WatchSet};

/// Read-only view of a changedetection.io instance.
///
/// Every call is a single round-trip without retries. Per-watch calls return
/// [`cdio_common::CdioError::WatchNotFound`] when the watch was deleted
/// upstream, which callers treat as churn rather than failure.
#[async_trait]
pub trait WatchGateway: Send + Sync {
    async fn list_watches(&self) -> Result<WatchSet>;

    async fn get_watch_detail(&self, id: &str) -> Result<Watch>;

    /// Accepts the snapshot both as an object and as a one-element array.
    async fn get_latest_price(&self, id: &str) -> Result<PriceSnapshot>;

    async fn get_system_info(&self) -> Result<SystemInfo>;
}
