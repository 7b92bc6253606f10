//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` (or atomics for counters) so clones share
//! state and tests can assert on recorded calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};

use crate::batch::{BatchEvent, BatchReporter};
use crate::error::{AppError, ExtractionError};
use crate::models::{ContentRecord, Event, FetchErrorKind, FetchOutcome};
use crate::traits::{Cleaner, ContentExtractor, Extractor, Fetcher};

/// HTML that makes [`MockContentExtractor::panicking_on`] panic.
pub const PANIC_MARKER: &str = "<panic/>";

/// Shorthand for a successful fetch outcome.
pub fn ok_html(html: &str) -> FetchOutcome {
    FetchOutcome::Success {
        html: html.to_string(),
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct MockRoute {
    outcome: FetchOutcome,
    delay: Duration,
}

/// Mock fetcher with per-URL outcomes and artificial latency.
///
/// A route whose delay exceeds the caller's timeout sleeps for the timeout
/// and then reports `Timeout`, mirroring a real client deadline.
#[derive(Clone)]
pub struct MockFetcher {
    routes: Arc<Mutex<HashMap<String, MockRoute>>>,
    default: MockRoute,
    calls: Arc<Mutex<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockFetcher {
    /// Every URL without a dedicated route succeeds with `html`.
    pub fn new(html: &str) -> Self {
        Self {
            routes: Arc::new(Mutex::new(HashMap::new())),
            default: MockRoute {
                outcome: ok_html(html),
                delay: Duration::ZERO,
            },
            calls: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_route(self, url: &str, outcome: FetchOutcome) -> Self {
        self.with_delayed_route(url, outcome, Duration::ZERO)
    }

    pub fn with_delayed_route(self, url: &str, outcome: FetchOutcome, delay: Duration) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), MockRoute { outcome, delay });
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default.delay = delay;
        self
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of simultaneously running fetches observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> FetchOutcome {
        self.calls.lock().unwrap().push(url.to_string());
        let route = self
            .routes
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| self.default.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let timed_out = route.delay > timeout;
        let wait = if timed_out { timeout } else { route.delay };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if timed_out {
            FetchOutcome::failure(FetchErrorKind::Timeout, format!("{timeout:?}"))
        } else {
            route.outcome
        }
    }
}

// ---------------------------------------------------------------------------
// MockContentExtractor
// ---------------------------------------------------------------------------

/// Mock content extractor: the trimmed HTML becomes the body text.
#[derive(Clone, Default)]
pub struct MockContentExtractor {
    panic_marker: Option<String>,
}

impl MockContentExtractor {
    /// Blank input fails, anything else becomes the body text.
    pub fn passthrough() -> Self {
        Self::default()
    }

    /// Like [`passthrough`](Self::passthrough), but panics on `marker`.
    pub fn panicking_on(marker: &str) -> Self {
        Self {
            panic_marker: Some(marker.to_string()),
        }
    }
}

impl ContentExtractor for MockContentExtractor {
    fn extract(&self, html: &str) -> Result<ContentRecord, ExtractionError> {
        if self.panic_marker.as_deref() == Some(html) {
            panic!("mock extractor asked to panic");
        }
        let body = html.trim();
        if body.is_empty() {
            return Err(ExtractionError::new("empty document"));
        }
        Ok(ContentRecord {
            title: None,
            meta_description: None,
            body_text: body.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// MockCleaner
// ---------------------------------------------------------------------------

/// Mock cleaner that returns its input unchanged.
#[derive(Clone)]
pub struct MockCleaner {
    error: Arc<Mutex<Option<AppError>>>,
}

impl MockCleaner {
    pub fn passthrough() -> Self {
        Self {
            error: Arc::new(Mutex::new(None)),
        }
    }

    /// Creates a cleaner that fails once with `error`.
    pub fn with_error(error: AppError) -> Self {
        Self {
            error: Arc::new(Mutex::new(Some(error))),
        }
    }
}

impl Cleaner for MockCleaner {
    fn clean(&self, html: &str) -> Result<String, AppError> {
        let mut err = self.error.lock().unwrap();
        if let Some(e) = err.take() {
            return Err(e);
        }
        Ok(html.to_string())
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock LLM extractor returning queued responses.
#[derive(Clone)]
pub struct MockExtractor {
    responses: Arc<Mutex<Vec<Result<Vec<Event>, AppError>>>>,
    /// Every content string passed to `extract`.
    pub seen: Arc<Mutex<Vec<String>>>,
}

impl MockExtractor {
    pub fn new(events: Vec<Event>) -> Self {
        Self::with_responses(vec![Ok(events)])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<Vec<Event>, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Extractor for MockExtractor {
    async fn extract(&self, content: &str) -> Result<Vec<Event>, AppError> {
        self.seen.lock().unwrap().push(content.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(Vec::new())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock batch reporter that records event labels.
#[derive(Clone, Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BatchReporter for MockReporter {
    fn report(&self, event: BatchEvent<'_>) {
        let label = match &event {
            BatchEvent::Started { .. } => "Started",
            BatchEvent::UnitCompleted { .. } => "UnitCompleted",
            BatchEvent::Finished { .. } => "Finished",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a dummy Event for testing.
pub fn make_test_event(band_name: &str) -> Event {
    Event {
        band_name: band_name.to_string(),
        date: Utc
            .with_ymd_and_hms(2024, 6, 1, 20, 0, 0)
            .single()
            .unwrap_or_default(),
        venue: "The Test Venue".to_string(),
        description: "An evening of test fixtures".to_string(),
    }
}
