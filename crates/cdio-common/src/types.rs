use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CdioError, Result};

/// Upstream watch listing keyed by watch id.
pub type WatchSet = HashMap<String, Watch>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Watch {
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_changed: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_checked: i64,
    /// Upstream sends `false` or the text of the last error.
    #[serde(default, deserialize_with = "error_flag")]
    pub last_error: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub check_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fetch_time: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notification_alert_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_check_status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<PriceSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub price: f64,
    #[serde(default, rename = "priceCurrency", deserialize_with = "null_as_default")]
    pub currency: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub availability: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uptime: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub watch_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub overdue_watches: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub queue_size: u64,
}

impl SystemInfo {
    pub fn overdue_watch_count(&self) -> usize {
        self.overdue_watches.len()
    }
}

/// Body of `GET /watch/{id}/history/latest`, which is served either as a bare
/// object or wrapped in an array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PriceResponse {
    Single(PriceSnapshot),
    Many(Vec<PriceSnapshot>),
}

impl PriceResponse {
    pub fn into_snapshot(self, watch_id: &str) -> Result<PriceSnapshot> {
        match self {
            Self::Single(snapshot) => Ok(snapshot),
            Self::Many(snapshots) => snapshots
                .into_iter()
                .next()
                .ok_or_else(|| CdioError::EmptyPriceHistory(watch_id.to_string())),
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Many(_))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn error_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(!matches!(
        value,
        serde_json::Value::Null | serde_json::Value::Bool(false)
    ))
}
