use std::time::Duration;

use async_trait::async_trait;
use cdio_common::{
    CdioError, PriceSnapshot, Result, SystemInfo, Watch, WatchSet, types::PriceResponse,
};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::gateway::WatchGateway;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const API_PREFIX: &str = "api/v1";

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    key: String,
}

impl ApiClient {
    pub fn new(base_url: &str, key: impl Into<String>) -> Self {
        Self::with_timeout(base_url, key, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: api_base_url(base_url),
            key: key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_base_url(&mut self, base_url: &str) {
        self.base_url = api_base_url(base_url);
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Issues a GET and maps non-success statuses. A 404 becomes
    /// `WatchNotFound` only when the route belongs to a single watch.
    async fn get(&self, path: &str, watch_id: Option<&str>) -> Result<Vec<u8>> {
        let target = self.endpoint(path);
        debug!(url = %target, "requesting changedetection.io api");

        let response = self
            .client
            .get(&target)
            .header(API_KEY_HEADER, &self.key)
            .send()
            .await
            .map_err(|err| CdioError::Transport {
                path: path.to_string(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND
            && let Some(id) = watch_id
        {
            return Err(CdioError::WatchNotFound(id.to_string()));
        }

        if !status.is_success() {
            return Err(CdioError::UnexpectedStatus {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|err| CdioError::Transport {
            path: path.to_string(),
            message: err.to_string(),
        })?;

        Ok(body.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, watch_id: Option<&str>) -> Result<T> {
        let body = self.get(path, watch_id).await?;
        decode(path, &body)
    }
}

#[async_trait]
impl WatchGateway for ApiClient {
    async fn list_watches(&self) -> Result<WatchSet> {
        self.get_json("watch", None).await
    }

    async fn get_watch_detail(&self, id: &str) -> Result<Watch> {
        self.get_json(&watch_path(id, None), Some(id)).await
    }

    async fn get_latest_price(&self, id: &str) -> Result<PriceSnapshot> {
        let response: PriceResponse = self
            .get_json(&watch_path(id, Some("history/latest")), Some(id))
            .await?;

        if response.is_sequence() {
            debug!(watch_id = %id, "price snapshot served as array");
        }

        response.into_snapshot(id)
    }

    async fn get_system_info(&self) -> Result<SystemInfo> {
        self.get_json("systeminfo", None).await
    }
}

fn api_base_url(base_url: &str) -> String {
    format!("{}/{API_PREFIX}", base_url.trim_end_matches('/'))
}

fn watch_path(id: &str, action: Option<&str>) -> String {
    let id = utf8_percent_encode(id, PATH_SEGMENT);
    match action {
        Some(action) => format!("watch/{id}/{action}"),
        None => format!("watch/{id}"),
    }
}

fn decode<T: DeserializeOwned>(path: &str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|err| CdioError::Decode {
        path: path.to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{ApiClient, watch_path};

    #[test]
    fn appends_api_prefix_once() {
        let client = ApiClient::new("http://localhost:8080/", "foo-bar-key");
        assert_eq!(client.base_url(), "http://localhost:8080/api/v1");
    }

    #[test]
    fn set_base_url_retargets_client() {
        let mut client = ApiClient::new("http://localhost:8080", "foo-bar-key");
        client.set_base_url("http://localhost:8081");
        assert_eq!(client.base_url(), "http://localhost:8081/api/v1");
        assert_eq!(
            client.endpoint("/watch"),
            "http://localhost:8081/api/v1/watch"
        );
    }

    #[test]
    fn watch_ids_are_single_path_segments() {
        assert_eq!(watch_path("abc", None), "watch/abc");
        assert_eq!(
            watch_path("a/b c", Some("history/latest")),
            "watch/a%2Fb%20c/history/latest"
        );
    }
}
