//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use tx_mediator::backend::{BackendInvoker, BackendOutcome};
use tx_mediator::config::MediatorConfig;
use tx_mediator::error::{QueueError, QueueResult};
use tx_mediator::queue::{CommitLog, InMemoryCommitLog, Message, MessageId};

pub const OK_BODY: &str = "<reply><status>ok</status></reply>";
pub const DENIED_BODY: &str = "<reply><status>Access denied</status></reply>";

/// A request as seen by a mock backend. Header names are lowercase.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl MockRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn redelivery_count(&self) -> u32 {
        self.header("x-redelivery-count")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}

/// Mediator config pointed at `backend_url`, tuned for fast tests.
pub fn test_config(backend_url: &str) -> MediatorConfig {
    let mut config = MediatorConfig::default();
    config.backend.url = backend_url.to_string();
    config.backend.timeout_ms = 500;
    config.backend.connect_timeout_ms = 200;
    config.queue.workers = 2;
    config.queue.redelivery_delay_ms = 20;
    config.queue.redelivery_max_delay_ms = 20;
    config.gateway.default_deadline_ms = 2_000;
    config.observability.metrics_enabled = false;
    config
}

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(MockRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            401 => "401 Unauthorized",
                            403 => "403 Forbidden",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request(socket: &mut TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let headers: HashMap<String, String> = head
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let end = (header_end + content_length).min(buf.len());
    let body = String::from_utf8_lossy(&buf[header_end..end]).to_string();

    Some(MockRequest { headers, body })
}

/// Backend that accepts `Claus`, returns 503 for `guest` and denies everyone
/// else. Counts calls per user.
pub async fn start_auth_backend() -> (SocketAddr, Arc<Mutex<HashMap<String, Vec<u32>>>>) {
    let seen: Arc<Mutex<HashMap<String, Vec<u32>>>> = Arc::default();
    let log = seen.clone();
    let addr = start_programmable_backend(move |req: MockRequest| {
        let log = log.clone();
        async move {
            let user = req.header("user").unwrap_or("").to_string();
            log.lock()
                .unwrap()
                .entry(user.clone())
                .or_default()
                .push(req.redelivery_count());
            match user.as_str() {
                "Claus" => (200, OK_BODY.to_string()),
                "guest" => (503, "down".to_string()),
                _ => (200, DENIED_BODY.to_string()),
            }
        }
    })
    .await;
    (addr, seen)
}

/// An address nothing listens on.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// One backend call observed by [`ScriptedInvoker`].
#[derive(Debug, Clone)]
pub struct Attempt {
    pub body: String,
    pub redelivery_count: u32,
    pub started: Instant,
    pub finished: Instant,
}

/// Invoker that plays back outcomes per request body, then repeats the last
/// one. Records every attempt and the peak concurrency.
pub struct ScriptedInvoker {
    scripts: Mutex<HashMap<String, VecDeque<BackendOutcome>>>,
    fallback: BackendOutcome,
    call_delay: Duration,
    attempts: Mutex<Vec<Attempt>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedInvoker {
    pub fn new(fallback: BackendOutcome) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback,
            call_delay: Duration::ZERO,
            attempts: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    /// Outcomes returned, in order, for requests whose body is `body`. The
    /// last outcome repeats.
    pub fn script(self, body: &str, outcomes: Vec<BackendOutcome>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(body.to_string(), outcomes.into());
        self
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempts_for(&self, body: &str) -> Vec<Attempt> {
        self.attempts()
            .into_iter()
            .filter(|a| a.body == body)
            .collect()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn next_outcome(&self, body: &str) -> BackendOutcome {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(body) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| self.fallback.clone()),
            None => self.fallback.clone(),
        }
    }
}

#[async_trait]
impl BackendInvoker for ScriptedInvoker {
    async fn invoke(&self, message: &Message, _budget: Duration) -> BackendOutcome {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        let started = Instant::now();
        let body = String::from_utf8_lossy(&message.body).to_string();
        if !self.call_delay.is_zero() {
            tokio::time::sleep(self.call_delay).await;
        }
        let outcome = self.next_outcome(&body);

        self.attempts.lock().unwrap().push(Attempt {
            body,
            redelivery_count: message.redelivery_count(),
            started,
            finished: Instant::now(),
        });
        self.active.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

/// Commit log that fails the first `failures` commits.
pub struct FlakyCommitLog {
    remaining_failures: AtomicUsize,
    inner: InMemoryCommitLog,
}

impl FlakyCommitLog {
    pub fn new(failures: usize) -> Self {
        Self {
            remaining_failures: AtomicUsize::new(failures),
            inner: InMemoryCommitLog::default(),
        }
    }
}

impl CommitLog for FlakyCommitLog {
    fn record_commit(&self, message: &Message) -> QueueResult<()> {
        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(QueueError::CommitFailed {
                message_id: message.id,
                reason: "injected failure".to_string(),
            });
        }
        self.inner.record_commit(message)
    }

    fn is_committed(&self, id: &MessageId) -> bool {
        self.inner.is_committed(id)
    }
}

/// Poll `f` until it returns true or `timeout` elapses.
pub async fn eventually<F: Fn() -> bool>(timeout: Duration, f: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if f() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    f()
}
