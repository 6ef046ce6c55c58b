// Test doubles for the three trait seams:
// - FakeAdapter (SourceAdapter): canned outcome, counts calls
// - FakeProbe (ImageProbe): fixed set of live references, records probes
// - FakeDownloader (ImageDownloader): maps URLs to local paths or fails
//
// CannedServer is a loopback HTTP server with fixed answers, for driving the
// real clients, probe and downloader. Filesystem fixtures come from tempfile.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use profilesync_common::{Network, ProfileSnapshot, ProfileSyncError, Result};

use crate::adapters::{FetchFailure, FetchOutcome, SourceAdapter};
use crate::images::{ImageDownloader, ImageProbe};

// ---------------------------------------------------------------------------
// FakeAdapter
// ---------------------------------------------------------------------------

/// Shared view of how often a fake was invoked.
#[derive(Debug, Clone, Default)]
pub struct CallCount(Arc<AtomicUsize>);

impl CallCount {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeAdapter {
    name: String,
    outcome: FetchOutcome,
    calls: CallCount,
}

impl FakeAdapter {
    pub fn succeeding(name: &str, profile: ProfileSnapshot) -> Self {
        Self {
            name: name.to_string(),
            outcome: Ok(profile),
            calls: CallCount::default(),
        }
    }

    pub fn failing(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            outcome: Err(FetchFailure::Upstream(reason.to_string())),
            calls: CallCount::default(),
        }
    }

    pub fn calls(&self) -> CallCount {
        self.calls.clone()
    }
}

#[async_trait]
impl SourceAdapter for FakeAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> FetchOutcome {
        self.calls.bump();
        self.outcome.clone()
    }
}

// ---------------------------------------------------------------------------
// FakeProbe
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeProbe {
    live: HashSet<String>,
    probed: Mutex<Vec<String>>,
}

impl FakeProbe {
    pub fn live(references: &[&str]) -> Self {
        Self {
            live: references.iter().map(|r| r.to_string()).collect(),
            probed: Mutex::new(Vec::new()),
        }
    }

    /// Every reference probed so far, in order.
    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageProbe for FakeProbe {
    async fn is_live(&self, reference: &str) -> bool {
        self.probed.lock().unwrap().push(reference.to_string());
        self.live.contains(reference)
    }
}

// ---------------------------------------------------------------------------
// FakeDownloader
// ---------------------------------------------------------------------------

/// URL → local path. Unregistered URLs fail like a broken download.
#[derive(Default)]
pub struct FakeDownloader {
    saved: HashMap<String, PathBuf>,
    requests: Mutex<Vec<(Network, String)>>,
}

impl FakeDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, url: &str, local: &str) -> Self {
        self.saved.insert(url.to_string(), PathBuf::from(local));
        self
    }

    pub fn requests(&self) -> Vec<(Network, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageDownloader for FakeDownloader {
    async fn download(&self, network: Network, url: &str) -> Result<PathBuf> {
        self.requests
            .lock()
            .unwrap()
            .push((network, url.to_string()));
        self.saved
            .get(url)
            .cloned()
            .ok_or_else(|| ProfileSyncError::ImageDownload(format!("{url}: status 404")))
    }
}

// ---------------------------------------------------------------------------
// CannedServer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CannedResponse {
    status: u16,
    content_type: String,
    body: Vec<u8>,
}

impl CannedResponse {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json".to_string(),
            body: body.to_string().into_bytes(),
        }
    }

    pub fn bytes(status: u16, content_type: &str, body: &[u8]) -> Self {
        Self {
            status,
            content_type: content_type.to_string(),
            body: body.to_vec(),
        }
    }
}

/// One answer: the first route whose method matches and whose request
/// target contains `needle` wins. Unmatched requests get a 404.
#[derive(Debug, Clone)]
pub struct Route {
    method: &'static str,
    needle: String,
    response: CannedResponse,
}

impl Route {
    pub fn get(needle: &str, response: CannedResponse) -> Self {
        Self {
            method: "GET",
            needle: needle.to_string(),
            response,
        }
    }

    pub fn head(needle: &str, response: CannedResponse) -> Self {
        Self {
            method: "HEAD",
            needle: needle.to_string(),
            response,
        }
    }
}

/// Loopback HTTP/1.1 server. One request per connection, then close.
pub struct CannedServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CannedServer {
    pub async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let routes = Arc::new(routes);
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(answer(stream, routes.clone(), seen.clone()));
            }
        });

        Self { base_url, requests }
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Request heads received so far (request line plus headers), lowercased.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn answer(mut stream: TcpStream, routes: Arc<Vec<Route>>, seen: Arc<Mutex<Vec<String>>>) {
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&head).to_string();
    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    seen.lock().unwrap().push(head.to_ascii_lowercase());

    let response = routes
        .iter()
        .find(|r| r.method == method && target.contains(&r.needle))
        .map(|r| r.response.clone())
        .unwrap_or_else(|| CannedResponse::bytes(404, "text/plain", b"not found"));

    let preamble = format!(
        "HTTP/1.1 {} Canned\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        response.content_type,
        response.body.len()
    );
    let _ = stream.write_all(preamble.as_bytes()).await;
    if method != "HEAD" {
        let _ = stream.write_all(&response.body).await;
    }
    let _ = stream.shutdown().await;
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn profile(username: &str, followers: u64, image: Option<&str>) -> ProfileSnapshot {
    ProfileSnapshot {
        username: username.to_string(),
        follower_count: followers,
        image_reference: image.map(str::to_string),
        ..Default::default()
    }
}
