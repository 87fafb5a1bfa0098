//! A fake backend for end-to-end session tests.
//!
//! The API and admin surfaces are axum servers on ephemeral ports inside
//! the test process. The "backend executable" is a shell script, run by
//! `sh`, that announces those URLs on stderr the way the real backend does.

#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
};
use harness_rpc::{RequestEnvelope, ResponseEnvelope};
use harness_session::Options;
use tempfile::TempDir;

/// What the script does after starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Announce both endpoints and exit once `/quit` is hit.
    Cooperative,
    /// Announce both endpoints and never exit on its own.
    IgnoresQuit,
    /// Announce only the API endpoint.
    ApiOnly,
    /// Announce an admin endpoint nobody listens on.
    DeadAdmin,
}

#[derive(Debug, Default)]
pub struct Recorder {
    pub api_hits: AtomicUsize,
    pub quit_hits: AtomicUsize,
    pub headers: Mutex<Vec<HeaderMap>>,
    pub envelopes: Mutex<Vec<RequestEnvelope>>,
}

impl Recorder {
    pub fn api_hits(&self) -> usize {
        self.api_hits.load(Ordering::SeqCst)
    }

    pub fn quit_hits(&self) -> usize {
        self.quit_hits.load(Ordering::SeqCst)
    }

    pub fn last_headers(&self) -> HeaderMap {
        self.headers.lock().unwrap().last().cloned().unwrap()
    }
}

#[derive(Clone)]
struct AppState {
    recorder: Arc<Recorder>,
    marker: PathBuf,
}

pub struct FakeBackend {
    pub recorder: Arc<Recorder>,
    pub api_url: String,
    pub admin_url: String,
    pub script: PathBuf,
    scratch: TempDir,
}

impl FakeBackend {
    pub async fn start(behavior: Behavior) -> Self {
        let scratch = tempfile::tempdir().unwrap();
        let marker = scratch.path().join("quit");
        let recorder = Arc::new(Recorder::default());
        let state = AppState {
            recorder: Arc::clone(&recorder),
            marker: marker.clone(),
        };

        let api_url = serve(Router::new().route("/", post(api)).with_state(state.clone())).await;
        let admin_url = match behavior {
            Behavior::DeadAdmin => "http://127.0.0.1:1".to_string(),
            _ => serve(Router::new().route("/quit", get(quit)).with_state(state)).await,
        };

        let script = scratch.path().join("backend.sh");
        let body = script_body(behavior, &api_url, &admin_url, scratch.path(), &marker);
        std::fs::write(&script, body).unwrap();

        Self {
            recorder,
            api_url,
            admin_url,
            script,
            scratch,
        }
    }

    /// Options that launch this fake instead of the real backend.
    pub fn options(&self) -> Options {
        Options::new()
            .with_interpreters(["sh"])
            .with_executable_override(&self.script)
            .with_startup_timeout(Duration::from_secs(5))
            .with_shutdown_timeout(Duration::from_secs(5))
            .with_echo_diagnostics(false)
    }

    pub fn scratch(&self) -> &Path {
        self.scratch.path()
    }

    /// Pid of the script itself, as it recorded it.
    pub fn script_pid(&self) -> u32 {
        read_pid(&self.scratch.path().join(SCRIPT_PID))
    }

    /// Pid of a background process the script left in its process group.
    pub fn helper_pid(&self) -> u32 {
        read_pid(&self.scratch.path().join(HELPER_PID))
    }
}

const SCRIPT_PID: &str = "script.pid";
const HELPER_PID: &str = "helper.pid";

fn read_pid(path: &Path) -> u32 {
    std::fs::read_to_string(path).unwrap().trim().parse().unwrap()
}

/// Whether `pid` is a live process. A zombie counts as dead.
pub fn process_alive(pid: u32) -> bool {
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .ok()
        .and_then(|stat| {
            let state = stat.rsplit_once(") ")?.1.chars().next()?;
            Some(state != 'Z' && state != 'X')
        })
        .unwrap_or(false)
}

/// Poll until `pid` is gone.
pub async fn wait_until_dead(pid: u32) -> bool {
    for _ in 0..100 {
        if !process_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

fn script_body(
    behavior: Behavior,
    api_url: &str,
    admin_url: &str,
    scratch: &Path,
    marker: &Path,
) -> String {
    // The pid files are written before the announcement, so they exist
    // by the time a session is open.
    let pids = format!(
        "echo $$ > '{}'\nsleep 30 &\necho $! > '{}'\n",
        scratch.join(SCRIPT_PID).display(),
        scratch.join(HELPER_PID).display()
    );
    let api = format!("{pids}echo 'INFO Starting API server at: {api_url}' >&2\n");
    let admin = format!("echo 'INFO Starting admin server at: {admin_url}' >&2\n");
    match behavior {
        Behavior::Cooperative => format!(
            "{api}{admin}while [ ! -f '{}' ]; do sleep 0.05; done\nkill $!\n",
            marker.display()
        ),
        Behavior::IgnoresQuit | Behavior::DeadAdmin => format!("{api}{admin}exec sleep 30\n"),
        Behavior::ApiOnly => format!("{api}exec sleep 30\n"),
    }
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

async fn api(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Vec<u8> {
    state.recorder.api_hits.fetch_add(1, Ordering::SeqCst);
    state.recorder.headers.lock().unwrap().push(headers);

    let req: RequestEnvelope = serde_json::from_slice(&body).unwrap();
    state.recorder.envelopes.lock().unwrap().push(req.clone());

    let response = match req.method.as_str() {
        "Fail" => ResponseEnvelope::application_error(5, "boom"),
        "Hang" => std::future::pending().await,
        _ => ResponseEnvelope::success(&req.decode_request().unwrap()),
    };
    serde_json::to_vec(&response).unwrap()
}

async fn quit(State(state): State<AppState>) -> &'static str {
    state.recorder.quit_hits.fetch_add(1, Ordering::SeqCst);
    std::fs::write(&state.marker, b"").unwrap();
    "ok"
}
