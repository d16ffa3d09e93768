use thiserror::Error;

#[derive(Debug, Error)]
pub enum CdioError {
    #[error("watch {0} not found")]
    WatchNotFound(String),
    #[error("request to {path} failed: {message}")]
    Transport { path: String, message: String },
    #[error("request to {path} returned status {status}")]
    UnexpectedStatus { path: String, status: u16 },
    #[error("failed to decode response from {path}: {message}")]
    Decode { path: String, message: String },
    #[error("price history of watch {0} is empty")]
    EmptyPriceHistory(String),
    #[error("title is empty")]
    EmptyTitle,
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("host is empty in url {0:?}")]
    MissingHost(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl CdioError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::WatchNotFound(_))
    }

    /// Entity decoded fine but cannot be exposed with labels.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyTitle | Self::InvalidUrl { .. } | Self::MissingHost(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CdioError>;
