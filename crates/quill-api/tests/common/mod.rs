//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use http_body_util::BodyExt;
use quill_api::state::AppState;
use quill_content::application::projector::DeletePolicy;
use quill_core::generation::TextGenerator;
use quill_test_support::{SteppingClock, StubGenerator};
use sqlx::PgPool;
use tower::ServiceExt;

/// Canned completion returned by the default test generator.
pub const GENERATED_TEXT: &str = "Oceans cover roughly 71% of the Earth's surface.";

/// Build the full app over the in-memory backend with a stub generator.
pub fn build_test_app() -> Router {
    build_test_app_with(Arc::new(StubGenerator::new(GENERATED_TEXT)), DeletePolicy::Retain)
}

/// Build the full app over the in-memory backend with a custom generator and
/// delete policy. Each event gets a timestamp one second after the last.
pub fn build_test_app_with(generator: Arc<dyn TextGenerator>, policy: DeletePolicy) -> Router {
    let state = AppState::in_memory(Arc::new(SteppingClock::standard()), generator, policy);
    quill_api::app(state)
}

/// Build the full app over PostgreSQL with a stub generator.
pub fn build_pg_test_app(pool: PgPool) -> Router {
    let state = AppState::postgres(
        pool,
        Arc::new(SteppingClock::standard()),
        Arc::new(StubGenerator::new(GENERATED_TEXT)),
        DeletePolicy::Retain,
    );
    quill_api::app(state)
}

/// A fully buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Parses the body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    /// The body as UTF-8 text.
    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }

    /// The `Location` header value.
    pub fn location(&self) -> &str {
        self.headers["location"].to_str().unwrap()
    }
}

/// Send `request` and buffer the whole response body.
pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Send a POST request with a JSON body.
pub async fn post_json(app: &Router, uri: &str, body: &serde_json::Value) -> TestResponse {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a GET request and parse the JSON response.
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = send(app, request).await;
    (response.status, response.json())
}

/// Send a DELETE request and return the status.
pub async fn delete(app: &Router, uri: &str) -> StatusCode {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await.status
}

/// Extract the JSON payloads of every `data:` line in an SSE body.
pub fn sse_frames(body: &str) -> Vec<serde_json::Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim_start()).unwrap())
        .collect()
}
