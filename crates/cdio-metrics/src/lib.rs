pub mod handlers;
pub mod metrics;
pub mod router;

pub use router::{ExporterState, exporter_router};
