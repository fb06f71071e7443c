//! FakeGitHub - minimal GitHub contents API
//!
//! Serves `PUT` and `GET` on `/repos/{owner}/{repo}/contents/{*path}`,
//! decoding uploaded base64 and keeping files in memory. Every request is
//! counted so tests can assert the relay did (or did not) call the store.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::put,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const FAKE_OWNER: &str = "octo";
pub const FAKE_REPO: &str = "pics";
pub const FAKE_TOKEN: &str = "ghp_test_token";

/// How the fake answers writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Store the file and echo its name
    Accept,
    /// Store the file but echo a different name
    WrongName,
    /// Answer 200 with no `content` entry
    NoContent,
    /// Refuse with 422
    Reject,
}

#[derive(Debug, Deserialize)]
struct PutBody {
    message: String,
    content: String,
}

struct FakeState {
    files: Mutex<HashMap<String, Vec<u8>>>,
    messages: Mutex<Vec<String>>,
    user_agents: Mutex<Vec<String>>,
    requests: AtomicUsize,
    write_mode: Mutex<WriteMode>,
}

/// Running fake contents API
pub struct FakeGitHub {
    pub addr: SocketAddr,
    state: Arc<FakeState>,
    _handle: JoinHandle<()>,
}

impl FakeGitHub {
    /// Start the fake on a random port
    pub async fn start() -> Result<Self> {
        let state = Arc::new(FakeState {
            files: Mutex::new(HashMap::new()),
            messages: Mutex::new(Vec::new()),
            user_agents: Mutex::new(Vec::new()),
            requests: AtomicUsize::new(0),
            write_mode: Mutex::new(WriteMode::Accept),
        });

        let router = Router::new()
            .route(
                "/repos/{owner}/{repo}/contents/{*path}",
                put(put_contents).get(get_contents),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                eprintln!("FakeGitHub error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Base URL to configure as `store.api_url`
    pub fn api_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of requests received so far
    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Commit messages of accepted writes, in order
    pub fn messages(&self) -> Vec<String> {
        self.state.messages.lock().unwrap().clone()
    }

    /// User-Agent header of every request, in order
    pub fn user_agents(&self) -> Vec<String> {
        self.state.user_agents.lock().unwrap().clone()
    }

    /// Decoded contents of a stored file
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.files.lock().unwrap().get(path).cloned()
    }

    /// Seed a file directly
    pub fn insert(&self, path: &str, data: &[u8]) {
        self.state
            .files
            .lock()
            .unwrap()
            .insert(path.to_string(), data.to_vec());
    }

    pub fn set_write_mode(&self, mode: WriteMode) {
        *self.state.write_mode.lock().unwrap() = mode;
    }
}

/// Record the request and check credentials; `Some` short-circuits
fn admit(state: &FakeState, owner: &str, repo: &str, headers: &HeaderMap) -> Option<Response> {
    state.requests.fetch_add(1, Ordering::SeqCst);

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.user_agents.lock().unwrap().push(user_agent.clone());
    if user_agent.is_empty() {
        return Some((StatusCode::FORBIDDEN, "User-Agent required").into_response());
    }

    let expected = format!("Bearer {}", FAKE_TOKEN);
    let authorized = headers
        .get(header::AUTHORIZATION)
        .is_some_and(|v| v.as_bytes() == expected.as_bytes());
    if !authorized {
        return Some(
            (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Bad credentials" }))).into_response(),
        );
    }

    if owner != FAKE_OWNER || repo != FAKE_REPO {
        return Some((StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response());
    }

    None
}

async fn put_contents(
    State(state): State<Arc<FakeState>>,
    Path((owner, repo, path)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<PutBody>,
) -> Response {
    if let Some(rejection) = admit(&state, &owner, &repo, &headers) {
        return rejection;
    }

    let mode = *state.write_mode.lock().unwrap();
    if mode == WriteMode::Reject {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "Invalid request" })),
        )
            .into_response();
    }

    let data = match BASE64.decode(body.content.as_bytes()) {
        Ok(data) => data,
        Err(_) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "message": "content is not valid Base64" })),
            )
                .into_response();
        }
    };

    state.files.lock().unwrap().insert(path.clone(), data);
    state.messages.lock().unwrap().push(body.message);

    let name = path.rsplit('/').next().unwrap_or(path.as_str()).to_string();
    let content = match mode {
        WriteMode::WrongName => json!({ "name": "someone-else.jpeg", "path": "someone-else.jpeg" }),
        WriteMode::NoContent => serde_json::Value::Null,
        _ => json!({ "name": name, "path": path, "sha": "3d21ec53a331a6f037a91c368710b99387d012c1" }),
    };

    (
        StatusCode::CREATED,
        Json(json!({ "content": content, "commit": { "message": "ok" } })),
    )
        .into_response()
}

async fn get_contents(
    State(state): State<Arc<FakeState>>,
    Path((owner, repo, path)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Some(rejection) = admit(&state, &owner, &repo, &headers) {
        return rejection;
    }

    let raw = headers
        .get(header::ACCEPT)
        .is_some_and(|v| v.as_bytes() == b"application/vnd.github.v3.raw");
    if !raw {
        return (StatusCode::NOT_ACCEPTABLE, "raw media type expected").into_response();
    }

    match state.files.lock().unwrap().get(&path) {
        Some(data) => (StatusCode::OK, data.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response(),
    }
}
