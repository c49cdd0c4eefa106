//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! Shared state lives behind `Arc<Mutex<_>>` or atomics so clones handed
//! to spawned fetch tasks record into the same place the test asserts on.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::error::AppError;
use crate::models::{Fragment, Row, RowHandle};
use crate::report::{EnrichEvent, Reporter};
use crate::traits::{Fetcher, FragmentExtractor, RowSink, RowSource};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher with per-locator failures, panics, hangs and latencies.
///
/// Tracks how many fetches are running at once so tests can assert on the
/// concurrency bound from the remote side.
#[derive(Clone)]
pub struct MockFetcher {
    body: String,
    failing: HashSet<String>,
    hanging: HashSet<String>,
    panicking: HashSet<String>,
    latency: Duration,
    latencies: HashMap<String, Duration>,
    calls: Arc<Mutex<Vec<(String, Instant)>>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl MockFetcher {
    pub fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            failing: HashSet::new(),
            hanging: HashSet::new(),
            panicking: HashSet::new(),
            latency: Duration::ZERO,
            latencies: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Override the latency for one locator.
    pub fn with_latency_for(mut self, locator: &str, latency: Duration) -> Self {
        self.latencies.insert(locator.to_string(), latency);
        self
    }

    /// Simulate a transport failure for `locator` (after the latency).
    pub fn failing_on(mut self, locator: &str) -> Self {
        self.failing.insert(locator.to_string());
        self
    }

    /// Never settle for `locator`.
    pub fn hanging_on(mut self, locator: &str) -> Self {
        self.hanging.insert(locator.to_string());
        self
    }

    /// Panic inside the fetch task for `locator` (after the latency).
    pub fn panicking_on(mut self, locator: &str) -> Self {
        self.panicking.insert(locator.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(locator, _)| locator.clone())
            .collect()
    }

    /// Each call's locator and start time relative to `origin`.
    pub fn call_offsets(&self, origin: Instant) -> Vec<(String, Duration)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(locator, at)| (locator.clone(), at.duration_since(origin)))
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter even when the fetch future is dropped
/// by a timeout.
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(in_flight: &Arc<AtomicUsize>, peak: &Arc<AtomicUsize>) -> Self {
        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self(Arc::clone(in_flight))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, locator: &str) -> Result<String, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((locator.to_string(), Instant::now()));
        let _guard = InFlightGuard::enter(&self.in_flight, &self.peak);

        let latency = self.latencies.get(locator).copied().unwrap_or(self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.hanging.contains(locator) {
            std::future::pending::<()>().await;
        }
        if self.panicking.contains(locator) {
            panic!("fetch task for {locator} panicked");
        }
        if self.failing.contains(locator) {
            return Err(AppError::NetworkError(format!(
                "Connection failed: {locator}"
            )));
        }
        Ok(self.body.clone())
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor: a non-empty body is the fragment, an empty body has none.
#[derive(Clone, Default)]
pub struct MockExtractor {
    error: Option<String>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extractor that fails on every page.
    pub fn with_error(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
        }
    }
}

impl FragmentExtractor for MockExtractor {
    fn extract(&self, html: &str) -> Result<Option<Fragment>, AppError> {
        if let Some(message) = &self.error {
            return Err(AppError::ParseError(message.clone()));
        }
        if html.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Fragment(html.to_string())))
        }
    }
}

// ---------------------------------------------------------------------------
// MockRowSource
// ---------------------------------------------------------------------------

/// Mock row source replaying a script of row sets.
///
/// Each call pops the next scripted set; once the script runs out the last
/// set is repeated, matching a page that has settled.
#[derive(Clone)]
pub struct MockRowSource {
    script: Arc<Mutex<VecDeque<Vec<Row>>>>,
    settled: Arc<Mutex<Vec<Row>>>,
    calls: Arc<AtomicUsize>,
}

impl MockRowSource {
    pub fn always_empty() -> Self {
        Self::scripted(Vec::new())
    }

    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self::scripted(vec![rows])
    }

    /// Report no rows for `empty_attempts` calls, then `rows`.
    pub fn appearing_after(empty_attempts: usize, rows: Vec<Row>) -> Self {
        let mut script = vec![Vec::new(); empty_attempts];
        script.push(rows);
        Self::scripted(script)
    }

    pub fn scripted(script: Vec<Vec<Row>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            settled: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RowSource for MockRowSource {
    async fn list_rows(&self) -> Vec<Row> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let mut settled = self.settled.lock().unwrap();
        if let Some(rows) = script.pop_front() {
            *settled = rows;
        }
        settled.clone()
    }
}

// ---------------------------------------------------------------------------
// MockSink
// ---------------------------------------------------------------------------

/// Mock sink that records applied fragments and presentation calls.
#[derive(Clone, Default)]
pub struct MockSink {
    results: Arc<Mutex<HashMap<RowHandle, Fragment>>>,
    pub presented: Arc<Mutex<Vec<RowHandle>>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose `rows` already carry a diffstat.
    pub fn with_enriched(rows: &[RowHandle]) -> Self {
        let sink = Self::new();
        {
            let mut results = sink.results.lock().unwrap();
            for row in rows {
                results.insert(*row, Fragment("existing".into()));
            }
        }
        sink
    }

    pub fn result_for(&self, row: RowHandle) -> Option<Fragment> {
        self.results.lock().unwrap().get(&row).cloned()
    }
}

impl RowSink for MockSink {
    fn has_existing_result(&self, row: RowHandle) -> bool {
        self.results.lock().unwrap().contains_key(&row)
    }

    fn apply_result(&self, row: RowHandle, fragment: &Fragment) {
        self.results.lock().unwrap().insert(row, fragment.clone());
    }

    fn apply_presentation(&self, row: &Row) {
        self.presented.lock().unwrap().push(row.handle);
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock reporter that records event labels.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, label: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.as_str() == label)
            .count()
    }
}

impl Reporter for MockReporter {
    fn report(&self, event: EnrichEvent<'_>) {
        let label = match &event {
            EnrichEvent::PollAttempt { .. } => "PollAttempt",
            EnrichEvent::RowsNotReady { .. } => "RowsNotReady",
            EnrichEvent::RetriesExhausted { .. } => "RetriesExhausted",
            EnrichEvent::WaitExhausted { .. } => "WaitExhausted",
            EnrichEvent::RowsReady { .. } => "RowsReady",
            EnrichEvent::RowMalformed { .. } => "RowMalformed",
            EnrichEvent::Dispatched { .. } => "Dispatched",
            EnrichEvent::AlreadyEnriched { .. } => "AlreadyEnriched",
            EnrichEvent::Applied { .. } => "Applied",
            EnrichEvent::Absent { .. } => "Absent",
            EnrichEvent::Pacing { .. } => "Pacing",
            EnrichEvent::Drained { .. } => "Drained",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Build `n` well-formed rows linking to `/acme/app/pull/{i}`.
pub fn make_rows(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| Row::new(RowHandle(i), format!("/acme/app/pull/{i}"), format!("PR {i}")))
        .collect()
}

/// Build a work queue over `make_rows(n)`.
pub fn make_queue(n: usize) -> crate::models::WorkQueue {
    make_rows(n).iter().filter_map(Row::work_item).collect()
}
