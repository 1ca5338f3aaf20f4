//! Integration tests for the HTTP read surface and the watch/fulfill flow.
//!
//! Each test spins up an Axum server on a random port backed by an in-memory
//! store, drives the watcher directly, and exercises the real HTTP contract.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;

use cert_courier::error::{FulfillmentError, StoreError};
use cert_courier::fulfillment::Fulfillment;
use cert_courier::server::{AppState, routes};
use cert_courier::sheet::SubmissionStore;
use cert_courier::watcher::{Watcher, WatcherState};

/// Maximum time any test request is allowed to take.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// In-memory submission store standing in for the sheet API.
struct InMemoryStore {
    rows: Mutex<Vec<Vec<String>>>,
    fail_reads: AtomicBool,
}

impl InMemoryStore {
    fn new(rows: Vec<Vec<String>>) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(rows),
            fail_reads: AtomicBool::new(false),
        })
    }

    fn append(&self, row: &[&str]) {
        self.rows
            .lock()
            .unwrap()
            .push(row.iter().map(|c| c.to_string()).collect());
    }
}

#[async_trait]
impl SubmissionStore for InMemoryStore {
    async fn list_rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Http("store unreachable".into()));
        }
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn update_cell(&self, row: usize, col: usize, value: &str) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let cells = rows
            .get_mut(row - 1)
            .ok_or_else(|| StoreError::InvalidResponse(format!("no row {row}")))?;
        if cells.len() < col {
            cells.resize(col, String::new());
        }
        cells[col - 1] = value.to_string();
        Ok(())
    }
}

/// Stub fulfillment that records calls and always succeeds.
struct StubFulfillment {
    calls: AtomicUsize,
}

impl StubFulfillment {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Fulfillment for StubFulfillment {
    async fn send(
        &self,
        _email: &str,
        _full_name: &str,
        _course: &str,
    ) -> Result<(), FulfillmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn header() -> Vec<&'static str> {
    vec!["Timestamp", "Email", "First Name", "Last Name", "Course", "Period", "Mobile"]
}

fn sheet_with(data_rows: &[[&str; 7]]) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> =
        vec![header().iter().map(|c| c.to_string()).collect()];
    for row in data_rows {
        rows.push(row.iter().map(|c| c.to_string()).collect());
    }
    rows
}

fn watcher_for(
    store: &Arc<InMemoryStore>,
    fulfillment: &Arc<StubFulfillment>,
    state: &Arc<WatcherState>,
) -> Watcher {
    let store: Arc<dyn SubmissionStore> = store.clone();
    let fulfillment: Arc<dyn Fulfillment> = fulfillment.clone();
    Watcher::new(
        store,
        fulfillment,
        Arc::clone(state),
        Duration::from_secs(5),
    )
    .with_timings(
        Duration::ZERO,
        Duration::from_secs(5),
        Duration::from_secs(5),
    )
}

/// Start the real server on a random port; returns its base URL.
async fn start_server(store: Arc<InMemoryStore>, watcher: Arc<WatcherState>) -> String {
    let store: Arc<dyn SubmissionStore> = store;
    let app = routes(AppState { store, watcher });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{addr}")
}

async fn get_text(url: &str) -> (u16, String) {
    let response = timeout(TEST_TIMEOUT, reqwest::get(url))
        .await
        .expect("request timed out")
        .expect("request failed");
    let status = response.status().as_u16();
    let body = response.text().await.expect("body read failed");
    (status, body)
}

async fn get_json(url: &str) -> Value {
    let (status, body) = get_text(url).await;
    assert_eq!(status, 200, "unexpected status for {url}: {body}");
    serde_json::from_str(&body).expect("invalid JSON")
}

// ── Health: seeded identities, idle loop ────────────────────────────

#[tokio::test]
async fn health_reports_seeded_state() {
    let store = InMemoryStore::new(sheet_with(&[
        ["t1", "a@x.com", "Ann", "Ao", "CourseA", "P1", "1"],
        ["t2", "b@x.com", "Ben", "Bo", "CourseA", "P1", "2"],
        ["t3", "c@x.com", "Cal", "Co", "CourseB", "P2", "3"],
    ]));
    let fulfillment = StubFulfillment::new();
    let state = Arc::new(WatcherState::new());
    watcher_for(&store, &fulfillment, &state).seed().await.unwrap();

    let base = start_server(Arc::clone(&store), Arc::clone(&state)).await;
    let health = get_json(&format!("{base}/health")).await;

    assert_eq!(health["status"], "up");
    assert_eq!(health["processed_users_count"], 3);
    assert_eq!(health["last_processed_row"], 4);
    assert_eq!(health["actively_processing"], false);
    assert!(health["timestamp"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn processed_users_lists_identity_keys() {
    let store = InMemoryStore::new(sheet_with(&[[
        "t1", "a@x.com", "Ann", "Ao", "CourseA", "P1", "1",
    ]]));
    let fulfillment = StubFulfillment::new();
    let state = Arc::new(WatcherState::new());
    watcher_for(&store, &fulfillment, &state).seed().await.unwrap();

    let base = start_server(Arc::clone(&store), Arc::clone(&state)).await;
    let body = get_json(&format!("{base}/processed_users")).await;

    assert_eq!(body["count"], 1);
    let keys: Vec<&str> = body["processed_users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["a@x.com:ann:ao"]);
}

// ── End-to-end: append → fulfill → visible on /status ───────────────

#[tokio::test]
async fn appended_row_becomes_certificate_sent_on_status_page() {
    let store = InMemoryStore::new(sheet_with(&[]));
    let fulfillment = StubFulfillment::new();
    let state = Arc::new(WatcherState::new());
    let watcher = watcher_for(&store, &fulfillment, &state);
    watcher.seed().await.unwrap();

    store.append(&["t2", "new@x.com", "Jo", "Li", "CourseA", "P1", "555"]);
    watcher.poll_once().await.unwrap();
    assert_eq!(fulfillment.calls.load(Ordering::SeqCst), 1);

    let base = start_server(Arc::clone(&store), Arc::clone(&state)).await;
    let (status, body) = get_text(&format!("{base}/status")).await;
    assert_eq!(status, 200);
    assert!(body.contains("new@x.com"));
    assert!(body.contains("Certificate Sent"));
}

#[tokio::test]
async fn duplicate_append_is_flagged_and_not_fulfilled() {
    let store = InMemoryStore::new(sheet_with(&[[
        "t1", "new@x.com", "Jo", "Li", "CourseA", "P1", "555",
    ]]));
    let fulfillment = StubFulfillment::new();
    let state = Arc::new(WatcherState::new());
    let watcher = watcher_for(&store, &fulfillment, &state);
    watcher.seed().await.unwrap();

    store.append(&["t2", "NEW@X.COM", "jo", "li", "CourseA", "P1", "555"]);
    watcher.poll_once().await.unwrap();
    assert_eq!(fulfillment.calls.load(Ordering::SeqCst), 0);

    let base = start_server(Arc::clone(&store), Arc::clone(&state)).await;
    let (_, body) = get_text(&format!("{base}/status")).await;
    assert!(body.contains("Duplicate - No Certificate Sent"));
}

// ── Status page bounds and pages ────────────────────────────────────

#[tokio::test]
async fn status_page_shows_at_most_ten_rows() {
    let mut rows = sheet_with(&[]);
    for i in 1..=12 {
        let email = format!("user{i}@x.com");
        rows.push(
            ["t", email.as_str(), "U", "Ser", "CourseA", "P1", "1"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        );
    }
    let store = InMemoryStore::new(rows);
    let state = Arc::new(WatcherState::new());

    let base = start_server(Arc::clone(&store), state).await;
    let (_, body) = get_text(&format!("{base}/status")).await;

    assert!(body.contains("user12@x.com"));
    assert!(body.contains("user3@x.com"));
    assert!(!body.contains("user2@x.com"));
}

#[tokio::test]
async fn landing_and_admin_pages_serve() {
    let store = InMemoryStore::new(sheet_with(&[]));
    let state = Arc::new(WatcherState::new());
    let base = start_server(store, state).await;

    let (status, body) = get_text(&base).await;
    assert_eq!(status, 200);
    assert!(body.contains("Certificate Courier"));

    let (status, body) = get_text(&format!("{base}/admin")).await;
    assert_eq!(status, 200);
    assert!(body.contains("Admin"));
}

#[tokio::test]
async fn status_page_surfaces_store_errors_as_500() {
    let store = InMemoryStore::new(sheet_with(&[]));
    store.fail_reads.store(true, Ordering::SeqCst);
    let state = Arc::new(WatcherState::new());
    let base = start_server(Arc::clone(&store), state).await;

    let (status, body) = get_text(&format!("{base}/status")).await;
    assert_eq!(status, 500);
    assert!(body.contains("Error retrieving status"));
}
