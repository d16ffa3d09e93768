pub mod error;
pub mod labels;
pub mod types;

pub use error::{CdioError, Result};
pub use labels::{WATCH_LABELS, derive_labels};
pub use types::{PriceResponse, PriceSnapshot, SystemInfo, Watch, WatchSet};
