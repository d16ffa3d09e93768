pub mod collector;
pub mod collectors;
pub mod registry;
pub mod types;

pub use collector::{BaseCollector, Collector, WatchCache};
pub use collectors::{
    http::{HttpMetrics, InFlightGuard},
    price::PriceCollector,
    process::ProcessCollector,
    system::SystemCollector,
    watch::WatchCollector,
};
pub use registry::{CounterMetric, GaugeMetric, HistogramMetric, MetricsRegistry, render_text};
pub use types::{
    CollectedMetric, ConstMetric, MetricDescriptor, MetricSample, MetricType, MetricValue,
    NAMESPACE, build_fq_name,
};
