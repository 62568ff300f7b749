// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use reqwest::Client;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// One request seen by the fake vendor.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub api_key: Option<String>,
}

/// Shared log of everything the fake vendor received, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<RecordedRequest>>>);

impl RequestLog {
    pub fn all(&self) -> Vec<RecordedRequest> {
        self.0.lock().unwrap().clone()
    }

    pub fn total(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn requests_to(&self, path: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|r| r.path == path).count()
    }

    pub fn logins(&self) -> usize {
        self.requests_to("/login")
    }

    /// Paths of every non-login request.
    pub fn resource_paths(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path != "/login")
            .map(|r| r.path.clone())
            .collect()
    }

    fn push(&self, request: RecordedRequest) {
        self.0.lock().unwrap().push(request);
    }
}

/// Canned vendor API: a path -> (status, body) table, everything else is 404.
#[derive(Debug, Clone, Default)]
pub struct FakeVendor {
    routes: HashMap<String, (u16, String)>,
    delay: Option<Duration>,
}

impl FakeVendor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path: &str, status: u16, body: &str) -> Self {
        self.routes.insert(path.to_owned(), (status, body.to_owned()));
        self
    }

    /// Successful login answering with `token` valid for `expires_in` seconds.
    pub fn login(self, token: &str, expires_in: i64) -> Self {
        let body = json!({"access_token": token, "expires_in": expires_in}).to_string();
        self.route("/login", 200, &body)
    }

    /// Delay every response, to force overlapping requests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

struct FakeVendorState {
    vendor: FakeVendor,
    log: RequestLog,
}

async fn fake_vendor_handler(
    State(state): State<Arc<FakeVendorState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);
    state.log.push(RecordedRequest {
        method,
        path: uri.path().to_owned(),
        query: uri.query().map(str::to_owned),
        authorization: header("authorization"),
        api_key: header("x-api-key"),
    });

    if let Some(delay) = state.vendor.delay {
        tokio::time::sleep(delay).await;
    }

    let (status, body) = state
        .vendor
        .routes
        .get(uri.path())
        .cloned()
        .unwrap_or((404, json!({"error": {"code": "NotFound", "path": uri.path()}}).to_string()));
    let content_type = if body.trim_start().starts_with('<') {
        "application/xml"
    } else {
        "application/json"
    };

    (
        StatusCode::from_u16(status).unwrap(),
        [(CONTENT_TYPE, content_type)],
        body,
    )
        .into_response()
}

/// Serve `vendor` on an ephemeral port; returns the handle, its base URL and the request log.
pub async fn spawn_fake_vendor(vendor: FakeVendor) -> (JoinHandle<()>, String, RequestLog) {
    let log = RequestLog::default();
    let state = Arc::new(FakeVendorState { vendor, log: log.clone() });
    let router = Router::new().fallback(fake_vendor_handler).with_state(state);
    let (handle, addr) = spawn_axum(router).await;
    (handle, format!("http://{}", addr), log)
}
