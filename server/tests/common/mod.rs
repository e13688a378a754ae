#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri, header};
use axum::response::Response;
use axum::{Json, Router};
use serde_json::{Value, json};
use synthia_db::Database;
use synthia_lib::app::SharedState;
use synthia_lib::auth::issue_session_token;
use synthia_lib::config::AppConfig;
use synthia_lib::server::router::create_router;
use tower::ServiceExt;

pub const SESSION_SECRET: &str = "integration-session-secret";
pub const CRON_SECRET: &str = "integration-cron-secret";
pub const PUBLIC_URL: &str = "https://synthia.test";

/// Config with sessions enabled and every upstream left unconfigured.
pub fn base_config() -> AppConfig {
    AppConfig {
        public_url: PUBLIC_URL.into(),
        session_secret: SESSION_SECRET.into(),
        ..AppConfig::default()
    }
}

pub struct TestApp {
    pub state: SharedState,
    router: Router,
}

impl TestApp {
    pub fn new(config: AppConfig) -> Self {
        Self::with_db(Database::open_in_memory().unwrap(), config)
    }

    pub fn with_db(db: Database, config: AppConfig) -> Self {
        let state = SharedState::new(db, config, std::env::temp_dir());
        let router = create_router(state.clone());
        Self { state, router }
    }

    pub fn db(&self) -> &Database {
        self.state.db()
    }

    pub async fn send(&self, req: Request<Body>) -> Response {
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// Send and decode the JSON body.
    pub async fn json(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.send(req).await;
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

pub fn session_token(email: &str) -> String {
    issue_session_token(SESSION_SECRET, email, None, chrono::Duration::hours(1)).unwrap()
}

pub fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    build(Method::GET, uri, bearer, Body::empty())
}

pub fn delete(uri: &str, bearer: Option<&str>) -> Request<Body> {
    build(Method::DELETE, uri, bearer, Body::empty())
}

pub fn post_json(uri: &str, bearer: Option<&str>, body: &Value) -> Request<Body> {
    let mut req = build(Method::POST, uri, bearer, Body::from(body.to_string()));
    req.headers_mut()
        .insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
    req
}

/// POST a raw body with one extra header, as webhook senders do.
pub fn post_signed(uri: &str, header_name: &str, header_value: Option<&str>, body: &[u8]) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = header_value {
        builder = builder.header(header_name, value);
    }
    builder.body(Body::from(body.to_vec())).unwrap()
}

fn build(method: Method, uri: &str, bearer: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body).unwrap()
}

// ---------------------------------------------------------------------------
// Upstream mock
// ---------------------------------------------------------------------------

/// One request seen by a [`MockUpstream`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

type Responder = Arc<dyn Fn(&Recorded) -> (u16, Value) + Send + Sync>;
type Calls = Arc<Mutex<Vec<Recorded>>>;

/// A local HTTP server standing in for Gemini, Fanvue, Stripe or ElevenLabs.
/// Every request is recorded and answered by the responder closure.
pub struct MockUpstream {
    pub base_url: String,
    calls: Calls,
}

impl MockUpstream {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&Recorded) -> (u16, Value) + Send + Sync + 'static,
    {
        Self::start_with_delay(Duration::ZERO, responder).await
    }

    /// Like [`MockUpstream::start`], but every answer is held back by `delay`.
    pub async fn start_with_delay<F>(delay: Duration, responder: F) -> Self
    where
        F: Fn(&Recorded) -> (u16, Value) + Send + Sync + 'static,
    {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let responder: Responder = Arc::new(responder);
        let app = Router::new()
            .fallback(record)
            .with_state((calls.clone(), responder, delay));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base_url: format!("http://{addr}"),
            calls,
        }
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path_prefix: &str) -> Vec<Recorded> {
        self.calls()
            .into_iter()
            .filter(|c| c.path.starts_with(path_prefix))
            .collect()
    }
}

async fn record(
    State((calls, responder, delay)): State<(Calls, Responder, Duration)>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let recorded = Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    let (status, reply) = responder(&recorded);
    calls.lock().unwrap().push(recorded);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    (StatusCode::from_u16(status).unwrap(), Json(reply))
}

/// A Gemini `generateContent` response carrying `text`.
pub fn gemini_text(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

/// Gemini mock that always answers with `text`.
pub async fn gemini_replying(text: &'static str) -> MockUpstream {
    MockUpstream::start(move |_| (200, gemini_text(text))).await
}

pub fn with_gemini(config: AppConfig, mock: &MockUpstream) -> AppConfig {
    AppConfig {
        gemini_api_key: "test-gemini-key".into(),
        gemini_api_base: mock.base_url.clone(),
        ..config
    }
}

pub fn with_fanvue(config: AppConfig, mock: &MockUpstream) -> AppConfig {
    AppConfig {
        fanvue_client_id: "client-id".into(),
        fanvue_client_secret: "client-secret".into(),
        fanvue_auth_base: mock.base_url.clone(),
        fanvue_api_base: mock.base_url.clone(),
        ..config
    }
}
