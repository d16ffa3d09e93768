use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use cdio_api::WatchGateway;
use cdio_common::error::Result;
use tower_http::trace::TraceLayer;

use crate::{
    handlers,
    metrics::{
        HttpMetrics, MetricsRegistry, PriceCollector, ProcessCollector, SystemCollector,
        WatchCollector,
    },
};

pub const HEALTH_LIVE_PATH: &str = "/health/live";
pub const HEALTH_READY_PATH: &str = "/health/ready";

pub struct ExporterState {
    pub gateway: Arc<dyn WatchGateway>,
    pub registry: Arc<MetricsRegistry>,
    pub http_metrics: Arc<HttpMetrics>,
}

impl ExporterState {
    /// Builds a registry with every collector sharing the one gateway.
    pub fn new(gateway: Arc<dyn WatchGateway>) -> Result<Self> {
        let registry = Arc::new(MetricsRegistry::new());
        registry.register_collector(Arc::new(PriceCollector::new(Arc::clone(&gateway))))?;
        registry.register_collector(Arc::new(WatchCollector::new(Arc::clone(&gateway))))?;
        registry.register_collector(Arc::new(SystemCollector::new(Arc::clone(&gateway))))?;
        registry.register_collector(Arc::new(ProcessCollector::new()))?;
        let http_metrics = Arc::new(HttpMetrics::register(registry.as_ref())?);

        Ok(Self {
            gateway,
            registry,
            http_metrics,
        })
    }
}

/// Serves the exposition at `/` and at `metrics_path`, plus the health routes.
/// `metrics_path` must not collide with the health routes.
pub fn exporter_router(state: Arc<ExporterState>, metrics_path: &str) -> Router {
    let mut router: Router<Arc<ExporterState>> = Router::new()
        .route("/", get(handlers::metrics::prometheus_metrics))
        .route(HEALTH_LIVE_PATH, get(handlers::health::health_live))
        .route(HEALTH_READY_PATH, get(handlers::health::health_ready));

    if metrics_path != "/" {
        router = router.route(metrics_path, get(handlers::metrics::prometheus_metrics));
    }

    router
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            handlers::metrics::track_http_metrics,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
