//! Local stand-in for the generation endpoint and the image CDN
//!
//! - `POST /generate` answers like the lifestyle-shot endpoint. Unless a
//!   scripted reply is queued, call *k* returns three URLs
//!   `<base>/images/<k>-<p>.png`.
//! - `GET /images/:name` serves a solid PNG keyed by `name`, or 404 for
//!   names starting with `missing`.

use super::image_fixtures::png_bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Reply for one generation call
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Default success reply
    Default,
    /// Status code and raw body
    Raw(u16, String),
}

/// A generation request as received
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub api_token: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct ServerState {
    base_url: String,
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    image_hits: Arc<Mutex<Vec<String>>>,
}

/// Running fake server
pub struct FakeBriaServer {
    pub base_url: String,
    state: ServerState,
    handle: JoinHandle<()>,
}

impl FakeBriaServer {
    /// Bind an ephemeral port on localhost and start serving
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let state = ServerState {
            base_url: base_url.clone(),
            replies: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            image_hits: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/generate", post(generate))
            .route("/images/:name", get(image))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            state,
            handle,
        }
    }

    pub fn endpoint_url(&self) -> String {
        format!("{}/generate", self.base_url)
    }

    /// Queue replies for the next generation calls, in order
    pub fn queue(&self, replies: impl IntoIterator<Item = ScriptedReply>) {
        self.state.replies.lock().unwrap().extend(replies);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn image_hits(&self) -> Vec<String> {
        self.state.image_hits.lock().unwrap().clone()
    }

    /// Default URL returned for placement `placement` of call `call`
    pub fn tile_url(&self, call: usize, placement: usize) -> String {
        format!("{}/images/{}-{}.png", self.base_url, call, placement)
    }
}

impl Drop for FakeBriaServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn generate(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let call = {
        let mut requests = state.requests.lock().unwrap();
        requests.push(RecordedRequest {
            api_token: headers
                .get("api_token")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body,
        });
        requests.len() - 1
    };

    let reply = state
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or(ScriptedReply::Default);

    match reply {
        ScriptedReply::Default => {
            let rows: Vec<Value> = (0..3)
                .map(|p| {
                    json!([
                        format!("{}/images/{}-{}.png", state.base_url, call, p),
                        1000 + p,
                        format!("req-{}-{}", call, p)
                    ])
                })
                .collect();
            Json(json!({ "result": rows })).into_response()
        }
        ScriptedReply::Raw(status, body) => (
            StatusCode::from_u16(status).unwrap(),
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
    }
}

async fn image(State(state): State<ServerState>, Path(name): Path<String>) -> Response {
    state.image_hits.lock().unwrap().push(name.clone());
    if name.starts_with("missing") {
        return StatusCode::NOT_FOUND.into_response();
    }
    (
        [(header::CONTENT_TYPE, "image/png")],
        png_bytes(&name),
    )
        .into_response()
}
