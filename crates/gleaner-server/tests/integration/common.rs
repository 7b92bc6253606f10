use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

use gleaner_server::config::ServerConfig;
use gleaner_server::routes;
use gleaner_server::state::AppState;

pub const SAMPLE_PAGE: &str =
    "<html><head><title>Sample</title></head><body><p>Hello world</p></body></html>";

const GIGS_PAGE: &str = "<html><head><title>Gigs</title></head><body><h1>Upcoming</h1><p>Sat 1 June: The Examples, Roundhouse</p></body></html>";

pub const LLM_ANSWER: &str = r#"{"events":[{"band_name":"The Examples","date":"2024-06-01T20:00:00Z","venue":"Roundhouse","description":"Album launch show"}]}"#;

pub struct TestApp {
    pub router: Router,
    /// Base URL of the fake page server.
    pub pages: String,
    /// Number of chat completion calls the fake LLM has answered.
    pub llm_calls: Arc<AtomicUsize>,
}

impl TestApp {
    pub fn page(&self, path: &str) -> String {
        format!("{}{path}", self.pages)
    }

    pub fn llm_calls(&self) -> usize {
        self.llm_calls.load(Ordering::SeqCst)
    }
}

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn page_server() -> String {
    serve(
        Router::new()
            .route("/plain", get(|| async { Html(SAMPLE_PAGE) }))
            .route("/gigs", get(|| async { Html(GIGS_PAGE) }))
            .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "nope") }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Html(SAMPLE_PAGE)
                }),
            ),
    )
    .await
}

async fn llm_server(calls: Arc<AtomicUsize>) -> String {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(move |Json(_request): Json<Value>| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Json(json!({
                    "choices": [{ "message": { "role": "assistant", "content": LLM_ANSWER } }]
                }))
            }
        }),
    );
    format!("{}/v1", serve(router).await)
}

async fn build(with_llm: bool) -> TestApp {
    let pages = page_server().await;
    let llm_calls = Arc::new(AtomicUsize::new(0));
    let llm_base = llm_server(llm_calls.clone()).await;

    let mut vars = vec![
        ("GLEANER_ALLOW_PRIVATE_URLS".to_string(), "true".to_string()),
        ("GLEANER_TIMEOUT_SECS".to_string(), "1".to_string()),
        ("GLEANER_MAX_URLS".to_string(), "5".to_string()),
    ];
    if with_llm {
        vars.push(("GLEANER_API_KEY".to_string(), "sk-test".to_string()));
        vars.push(("GLEANER_BASE_URL".to_string(), llm_base));
        vars.push(("GLEANER_MODEL".to_string(), "test-model".to_string()));
    }

    let config = ServerConfig::from_lookup(|name| {
        vars.iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    })
    .unwrap();

    let state = Arc::new(AppState::new(config).unwrap());

    TestApp {
        router: routes::router(state),
        pages,
        llm_calls,
    }
}

/// App with the fake LLM wired in.
pub async fn setup_test_app() -> TestApp {
    build(true).await
}

/// App with no LLM API key configured.
pub async fn setup_test_app_without_llm() -> TestApp {
    build(false).await
}

pub async fn post_json(router: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::post(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

pub async fn get_json(router: &Router, path: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}
