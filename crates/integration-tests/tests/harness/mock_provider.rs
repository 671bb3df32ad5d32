//! Mock chat provider for integration tests
//!
//! Speaks just enough of the `OpenAI`, Azure and MiniMax Pro protocols to
//! echo the last message back. A last message of the form
//! `sleep:<ms>:<text>` delays the reply; one containing `explode` is
//! rejected with 400.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

pub const MOCK_API_KEY: &str = "test-key";
pub const MOCK_GROUP_ID: &str = "group-1";

/// Mock provider that returns predictable responses
pub struct MockProvider {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

#[derive(Default)]
struct MockState {
    request_count: AtomicU32,
    /// Number of requests to fail with 500 before succeeding
    fail_count: AtomicU32,
    in_flight: AtomicU32,
    peak_in_flight: AtomicU32,
    last_request: Mutex<Option<Value>>,
}

impl MockProvider {
    /// Start the mock server, returning immediately
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner(0).await
    }

    /// Start a mock server that fails the first `n` requests with 500
    pub async fn start_failing(n: u32) -> anyhow::Result<Self> {
        Self::start_inner(n).await
    }

    async fn start_inner(fail_count: u32) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            fail_count: AtomicU32::new(fail_count),
            ..MockState::default()
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_openai))
            .route(
                "/openai/deployments/{deployment}/chat/completions",
                routing::post(handle_azure),
            )
            .route("/v1/text/chatcompletion_pro", routing::post(handle_minimax))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for an `OpenAI` endpoint, including `/v1`
    pub fn openai_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Base URL for an Azure endpoint
    pub fn azure_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Full MiniMax Pro completion URL
    pub fn minimax_url(&self) -> String {
        format!("http://{}/v1/text/chatcompletion_pro", self.addr)
    }

    /// Number of requests received, failures included
    pub fn request_count(&self) -> u32 {
        self.state.request_count.load(Ordering::SeqCst)
    }

    /// Highest number of requests served at once
    pub fn peak_in_flight(&self) -> u32 {
        self.state.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Body of the most recent request
    pub fn last_request(&self) -> Option<Value> {
        self.state.last_request.lock().unwrap().clone()
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Tracks in-flight requests for the lifetime of a handler
struct InFlight<'a>(&'a MockState);

impl<'a> InFlight<'a> {
    fn enter(state: &'a MockState) -> Self {
        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(state)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Common bookkeeping; returns an early response for injected failures
async fn admit(state: &MockState, body: &Value, prompt: &str) -> Option<Response> {
    state.request_count.fetch_add(1, Ordering::SeqCst);
    *state.last_request.lock().unwrap() = Some(body.clone());

    let remaining = state.fail_count.load(Ordering::SeqCst);
    if remaining > 0 {
        state.fail_count.fetch_sub(1, Ordering::SeqCst);
        return Some(
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": { "message": "mock server intentional failure", "type": "server_error" } })),
            )
                .into_response(),
        );
    }

    if prompt.contains("explode") {
        return Some(
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": { "message": "mock refused prompt", "type": "invalid_request_error" } })),
            )
                .into_response(),
        );
    }

    if let Some(delay) = parse_delay(prompt) {
        tokio::time::sleep(delay).await;
    }
    None
}

fn parse_delay(prompt: &str) -> Option<Duration> {
    let rest = prompt.strip_prefix("sleep:")?;
    let (ms, _) = rest.split_once(':')?;
    ms.parse().ok().map(Duration::from_millis)
}

fn reply_for(prompt: &str) -> String {
    format!("echo: {prompt}")
}

fn last_field<'a>(body: &'a Value, field: &str) -> &'a str {
    body["messages"]
        .as_array()
        .and_then(|messages| messages.last())
        .and_then(|message| message[field].as_str())
        .unwrap_or_default()
}

// -- OpenAI --

async fn handle_openai(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let _guard = InFlight::enter(&state);
    let prompt = last_field(&body, "content").to_owned();
    if let Some(response) = admit(&state, &body, &prompt).await {
        return response;
    }

    let model = body["model"].as_str().unwrap_or_default();
    let reply = reply_for(&prompt);
    if body["stream"].as_bool().unwrap_or(false) {
        return openai_stream(model, &reply);
    }
    Json(openai_completion(model, &reply)).into_response()
}

fn openai_completion(model: &str, reply: &str) -> Value {
    json!({
        "id": "chatcmpl-test-123",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": reply },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
}

/// SSE body: a role chunk, one chunk per word, a finish chunk, `[DONE]`
fn openai_stream(model: &str, reply: &str) -> Response {
    let chunk = |delta: Value, finish_reason: Option<&str>| {
        json!({
            "id": "chatcmpl-test-stream",
            "object": "chat.completion.chunk",
            "created": 1_700_000_000,
            "model": model,
            "choices": [{ "index": 0, "delta": delta, "finish_reason": finish_reason }]
        })
    };

    let mut events = vec![chunk(json!({ "role": "assistant" }), None)];
    let words: Vec<&str> = reply.split_inclusive(' ').collect();
    events.extend(words.iter().map(|word| chunk(json!({ "content": word }), None)));
    events.push(chunk(json!({}), Some("stop")));

    let mut body = String::new();
    for event in events {
        body.push_str(&format!("data: {event}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");

    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

// -- Azure --

async fn handle_azure(
    State(state): State<Arc<MockState>>,
    Path(deployment): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let _guard = InFlight::enter(&state);
    if headers.get("api-key").and_then(|v| v.to_str().ok()) != Some(MOCK_API_KEY) {
        return (StatusCode::UNAUTHORIZED, "missing api-key").into_response();
    }
    if !query.contains_key("api-version") {
        return (StatusCode::BAD_REQUEST, "missing api-version").into_response();
    }

    let prompt = last_field(&body, "content").to_owned();
    if let Some(response) = admit(&state, &body, &prompt).await {
        return response;
    }
    Json(openai_completion(&deployment, &reply_for(&prompt))).into_response()
}

// -- MiniMax Pro --

async fn handle_minimax(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let _guard = InFlight::enter(&state);
    if query.get("GroupId").map(String::as_str) != Some(MOCK_GROUP_ID) {
        return Json(json!({
            "choices": [],
            "base_resp": { "status_code": 2013, "status_msg": "invalid group id" }
        }))
        .into_response();
    }

    let prompt = last_field(&body, "text").to_owned();
    if let Some(response) = admit(&state, &body, &prompt).await {
        return response;
    }

    let bot = body["reply_constraints"]["sender_name"].as_str().unwrap_or_default();
    let reply = reply_for(&prompt);
    if body["stream"].as_bool().unwrap_or(false) {
        return minimax_stream(bot, &reply);
    }

    Json(json!({
        "created": 1_700_000_000,
        "model": body["model"],
        "reply": reply,
        "choices": [{
            "finish_reason": "stop",
            "messages": [{ "sender_type": "BOT", "sender_name": bot, "text": reply }]
        }],
        "usage": { "total_tokens": 2000 },
        "input_sensitive": false,
        "output_sensitive": false,
        "base_resp": { "status_code": 0, "status_msg": "" }
    }))
    .into_response()
}

/// Newline-delimited `data: ` lines; the last carries the full reply
fn minimax_stream(bot: &str, reply: &str) -> Response {
    let mut body = String::new();
    for word in reply.split_inclusive(' ') {
        let chunk = json!({
            "reply": "",
            "choices": [{ "messages": [{ "sender_type": "BOT", "sender_name": bot, "text": word }] }],
            "base_resp": { "status_code": 0, "status_msg": "" }
        });
        body.push_str(&format!("data: {chunk}\n"));
    }
    let last = json!({
        "reply": reply,
        "choices": [{
            "finish_reason": "stop",
            "messages": [{ "sender_type": "BOT", "sender_name": bot, "text": "" }]
        }],
        "usage": { "total_tokens": 1000 },
        "base_resp": { "status_code": 0, "status_msg": "" }
    });
    body.push_str(&format!("data: {last}\n"));

    ([(header::CONTENT_TYPE, "text/plain")], body).into_response()
}
