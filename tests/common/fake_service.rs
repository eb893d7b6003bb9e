/*!
 * In-process fake of the remote translation service.
 *
 * Every endpoint answers from a script and counts its calls. Scripted
 * response queues repeat their last entry once drained.
 */

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};

/// One scripted HTTP answer
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
    pub delay: Duration,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body, delay: Duration::ZERO }
    }

    pub fn status(status: u16) -> Self {
        Self { status, body: json!({"error": format!("status {}", status)}), delay: Duration::ZERO }
    }

    /// Hold the answer back for `delay`
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Default)]
struct Script {
    submit: VecDeque<Reply>,
    polls: VecDeque<Reply>,
    sync: VecDeque<Reply>,
}

fn next(queue: &mut VecDeque<Reply>) -> Reply {
    if queue.len() > 1 {
        queue.pop_front().unwrap()
    } else {
        queue.front().cloned().unwrap_or_else(|| Reply::status(404))
    }
}

/// Shared state of the fake
#[derive(Debug, Default)]
pub struct FakeState {
    script: Mutex<Script>,
    payloads: Mutex<Vec<Value>>,
    pub submit_calls: AtomicUsize,
    pub poll_calls: AtomicUsize,
    pub sync_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

/// Running fake service
pub struct FakeTranslationService {
    pub base_url: String,
    pub state: Arc<FakeState>,
}

impl FakeTranslationService {
    /// Start the fake on an ephemeral local port
    pub async fn start() -> Self {
        super::init_logging();
        let state = Arc::new(FakeState::default());

        let app = Router::new()
            .route("/api/v1/jobs/translate/content", post(submit))
            .route("/api/v1/jobs", get(list_jobs))
            .route("/api/v1/jobs/:id", get(poll).delete(cancel))
            .route("/api/v1/translate/content", post(sync))
            .route("/api/v1/status", get(status))
            .route("/api/v1/models", get(models))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url: format!("http://{}", addr), state }
    }

    /// Answers to job submissions
    pub fn on_submit(&self, replies: Vec<Reply>) -> &Self {
        self.state.script.lock().submit = replies.into();
        self
    }

    /// Answers to job polls
    pub fn on_poll(&self, replies: Vec<Reply>) -> &Self {
        self.state.script.lock().polls = replies.into();
        self
    }

    /// Answers to synchronous translations
    pub fn on_sync(&self, replies: Vec<Reply>) -> &Self {
        self.state.script.lock().sync = replies.into();
        self
    }

    /// Accept submissions as job `job-1`
    pub fn accept_jobs(&self) -> &Self {
        self.on_submit(vec![Reply::ok(json!({"jobId": "job-1"}))])
    }

    /// Bodies received by the submit and sync endpoints
    pub fn payloads(&self) -> Vec<Value> {
        self.state.payloads.lock().clone()
    }

    pub fn submit_calls(&self) -> usize {
        self.state.submit_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> usize {
        self.state.poll_calls.load(Ordering::SeqCst)
    }

    pub fn sync_calls(&self) -> usize {
        self.state.sync_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.state.delete_calls.load(Ordering::SeqCst)
    }
}

async fn respond(reply: Reply) -> (StatusCode, Json<Value>) {
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(reply.body))
}

async fn submit(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    state.submit_calls.fetch_add(1, Ordering::SeqCst);
    state.payloads.lock().push(body);
    let reply = next(&mut state.script.lock().submit);
    respond(reply).await
}

async fn poll(State(state): State<Arc<FakeState>>, Path(_id): Path<String>) -> (StatusCode, Json<Value>) {
    state.poll_calls.fetch_add(1, Ordering::SeqCst);
    let reply = next(&mut state.script.lock().polls);
    respond(reply).await
}

async fn cancel(State(state): State<Arc<FakeState>>, Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    state.delete_calls.fetch_add(1, Ordering::SeqCst);
    if id == "job-1" {
        respond(Reply::ok(json!({"jobId": id, "status": "cancelled"}))).await
    } else {
        respond(Reply::status(404)).await
    }
}

async fn sync(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    state.sync_calls.fetch_add(1, Ordering::SeqCst);
    state.payloads.lock().push(body);
    let reply = next(&mut state.script.lock().sync);
    respond(reply).await
}

async fn list_jobs() -> Json<Value> {
    Json(json!({"jobs": [{"jobId": "job-1", "status": "processing"}]}))
}

async fn status() -> Json<Value> {
    Json(json!({"status": "ok", "queue": {"pending": 0}}))
}

async fn models() -> Json<Value> {
    Json(json!({"models": ["model-a", "model-b"]}))
}
