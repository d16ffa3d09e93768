//! Client side of the changedetection.io REST API.
//!
//! Collectors only see the [`WatchGateway`] trait; [`ApiClient`] is the
//! reqwest-backed implementation talking to `<endpoint>/api/v1`.

pub mod client;
pub mod gateway;

pub use client::{API_KEY_HEADER, ApiClient, DEFAULT_REQUEST_TIMEOUT};
pub use gateway::WatchGateway;
