#![allow(dead_code)]

use std::sync::{Arc, RwLock};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use cdio_api::{API_KEY_HEADER, ApiClient};
use cdio_common::{PriceSnapshot, SystemInfo, Watch, WatchSet};
use tokio::{net::TcpListener, task::JoinHandle};

pub const TEST_API_KEY: &str = "foo-bar-key";

#[derive(Clone, Default)]
pub struct ServerOptions {
    pub prices_as_array: bool,
    pub malformed_prices: bool,
    pub system_info: Option<SystemInfo>,
}

struct ServerState {
    watches: RwLock<WatchSet>,
    options: ServerOptions,
}

pub struct TestApiServer {
    url: String,
    state: Arc<ServerState>,
    handle: JoinHandle<()>,
}

impl TestApiServer {
    pub async fn start(watches: WatchSet, options: ServerOptions) -> Self {
        let state = Arc::new(ServerState {
            watches: RwLock::new(watches),
            options,
        });

        let app = Router::new()
            .route("/api/v1/watch", get(list_watches))
            .route("/api/v1/watch/{id}", get(watch_detail))
            .route("/api/v1/watch/{id}/history/latest", get(latest_price))
            .route("/api/v1/systeminfo", get(system_info))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { url, state, handle }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.url, TEST_API_KEY)
    }

    pub fn insert(&self, id: String, watch: Watch) {
        self.state.watches.write().unwrap().insert(id, watch);
    }

    pub fn remove(&self, id: &str) {
        self.state.watches.write().unwrap().remove(id);
    }
}

impl Drop for TestApiServer {
    fn drop(&mut self) {
        self.handle.abort();
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

pub fn new_watch_db(items: &[(&str, f64)]) -> WatchSet {
    items
        .iter()
        .map(|(title, price)| new_test_item(title, *price, "USD", 20, 15.0, 10))
        .collect()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == TEST_API_KEY)
}

async fn list_watches(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    Json(state.watches.read().unwrap().clone()).into_response()
}

async fn watch_detail(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    match state.watches.read().unwrap().get(&id) {
        Some(watch) => Json(watch.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn latest_price(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let Some(watch) = state.watches.read().unwrap().get(&id).cloned() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if state.options.malformed_prices {
        return "plain text snapshot".into_response();
    }

    match watch.price {
        Some(price) if state.options.prices_as_array => Json(vec![price]).into_response(),
        Some(price) => Json(price).into_response(),
        None => Json(Vec::<PriceSnapshot>::new()).into_response(),
    }
}

async fn system_info(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let watches = state.watches.read().unwrap();
    let info = state.options.system_info.clone().unwrap_or(SystemInfo {
        version: "1.0.0".to_string(),
        uptime: 100.0,
        watch_count: watches.len() as u64,
        overdue_watches: Vec::new(),
        queue_size: 0,
    });
    Json(info).into_response()
}
