//! Concurrent fetch-and-extract over an ordered list of URLs.
//!
//! [`BatchService::run`] fans every URL out to its own tokio task, admits at
//! most `concurrency_limit` of them at a time through a semaphore, and joins
//! the task handles positionally so the output lines up 1:1 with the input.
//! A unit's failure (including a panic) is recorded in its own slot and
//! never touches its siblings.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    ErrorDescriptor, FetchErrorKind, FetchOutcome, FetchRequest, OutcomeKind, ResultRecord,
};
use crate::traits::{ContentExtractor, Fetcher};
use crate::util::normalize_url;

const DEFAULT_CONCURRENCY_LIMIT: usize = 10;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Knobs for a single batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Maximum number of units fetching/extracting at the same time.
    pub concurrency_limit: usize,
    /// Deadline for each individual fetch.
    pub timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl BatchConfig {
    pub fn new(concurrency_limit: usize, timeout: Duration) -> Self {
        Self {
            concurrency_limit,
            timeout,
        }
    }

    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.concurrency_limit == 0 {
            return Err(AppError::InvalidInput(
                "concurrency limit must be at least 1".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(AppError::InvalidInput("timeout must be non-zero".into()));
        }
        Ok(())
    }
}

/// Events emitted by a batch run for monitoring/logging.
#[derive(Debug, Clone)]
pub enum BatchEvent<'a> {
    Started {
        batch_id: Uuid,
        total: usize,
        concurrency_limit: usize,
    },
    UnitCompleted {
        batch_id: Uuid,
        index: usize,
        url: &'a str,
        outcome: OutcomeKind,
        elapsed: Duration,
    },
    Finished {
        batch_id: Uuid,
        total: usize,
        succeeded: usize,
        failed: usize,
        elapsed: Duration,
    },
}

/// Trait for receiving batch events (decoupled logging).
///
/// Called from inside the worker tasks, so implementations must be cheap
/// and thread-safe.
pub trait BatchReporter: Send + Sync {
    fn report(&self, event: BatchEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingBatchReporter;

impl BatchReporter for TracingBatchReporter {
    fn report(&self, event: BatchEvent<'_>) {
        match event {
            BatchEvent::Started {
                batch_id,
                total,
                concurrency_limit,
            } => {
                tracing::info!(%batch_id, total, concurrency_limit, "Batch started");
            }
            BatchEvent::UnitCompleted {
                batch_id,
                index,
                url,
                outcome,
                elapsed,
            } => {
                let elapsed_ms = elapsed.as_millis() as u64;
                if outcome == OutcomeKind::Success {
                    tracing::info!(%batch_id, index, %url, %outcome, elapsed_ms, "Unit completed");
                } else {
                    tracing::warn!(%batch_id, index, %url, %outcome, elapsed_ms, "Unit failed");
                }
            }
            BatchEvent::Finished {
                batch_id,
                total,
                succeeded,
                failed,
                elapsed,
            } => {
                tracing::info!(
                    %batch_id,
                    total,
                    succeeded,
                    failed,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Batch finished"
                );
            }
        }
    }
}

/// Reporter that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl BatchReporter for NullReporter {}

/// Validate and normalize the input list into fetch requests.
///
/// Fails on the first blank or unusable URL, naming its position; nothing
/// has been fetched at that point.
pub fn prepare_requests(urls: &[String]) -> Result<Vec<FetchRequest>, AppError> {
    urls.iter()
        .enumerate()
        .map(|(index, url)| {
            let target = normalize_url(url).map_err(|e| {
                AppError::InvalidInput(format!("URL at position {index} rejected: {e}"))
            })?;
            Ok(FetchRequest {
                index,
                url: url.clone(),
                target,
            })
        })
        .collect()
}

/// Runs the fetcher and, on success, the extractor for one request.
///
/// Extraction is CPU-bound and runs on the blocking pool.
pub async fn process_unit<F, X>(
    fetcher: &F,
    extractor: &X,
    request: &FetchRequest,
    timeout: Duration,
) -> ResultRecord
where
    F: Fetcher,
    X: ContentExtractor + 'static,
{
    match fetcher.fetch(&request.target, timeout).await {
        FetchOutcome::Success { html } => {
            let extractor = extractor.clone();
            match tokio::task::spawn_blocking(move || extractor.extract(&html)).await {
                Ok(Ok(content)) => ResultRecord::success(&request.url, content),
                Ok(Err(e)) => ResultRecord::failure(&request.url, e.into()),
                Err(e) => ResultRecord::failure(&request.url, aborted(&e)),
            }
        }
        FetchOutcome::Failure { kind, message } => {
            ResultRecord::failure(&request.url, ErrorDescriptor::Fetch { kind, message })
        }
    }
}

fn aborted(err: &tokio::task::JoinError) -> ErrorDescriptor {
    ErrorDescriptor::Fetch {
        kind: FetchErrorKind::Unknown,
        message: format!("unit task aborted: {err}"),
    }
}

/// Orchestrates concurrent fetch → extract over a batch of URLs.
///
/// Generic over the fetcher and extractor so tests can inject mocks.
pub struct BatchService<F, X>
where
    F: Fetcher,
    X: ContentExtractor,
{
    fetcher: F,
    extractor: X,
    reporter: Arc<dyn BatchReporter>,
}

impl<F, X> BatchService<F, X>
where
    F: Fetcher + 'static,
    X: ContentExtractor + 'static,
{
    /// Create a new BatchService that reports through `tracing`.
    pub fn new(fetcher: F, extractor: X) -> Self {
        Self {
            fetcher,
            extractor,
            reporter: Arc::new(TracingBatchReporter),
        }
    }

    /// Replace the event reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn BatchReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Fetch and extract every URL, returning one record per input in input order.
    ///
    /// Returns `Err` only when `config` or the URL list is unusable; per-URL
    /// failures are reported inside the returned records. Each call fetches
    /// afresh.
    pub async fn run(
        &self,
        urls: &[String],
        config: &BatchConfig,
    ) -> Result<Vec<ResultRecord>, AppError> {
        config.validate()?;
        let requests = prepare_requests(urls)?;

        let batch_id = Uuid::new_v4();
        let started = Instant::now();
        self.reporter.report(BatchEvent::Started {
            batch_id,
            total: requests.len(),
            concurrency_limit: config.concurrency_limit,
        });

        let semaphore = Arc::new(Semaphore::new(config.concurrency_limit));
        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let fetcher = self.fetcher.clone();
                let extractor = self.extractor.clone();
                let reporter = Arc::clone(&self.reporter);
                let semaphore = Arc::clone(&semaphore);
                let timeout = config.timeout;

                tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            return ResultRecord::failure(
                                request.url,
                                ErrorDescriptor::Fetch {
                                    kind: FetchErrorKind::Unknown,
                                    message: format!("admission refused: {e}"),
                                },
                            );
                        }
                    };

                    let unit_started = Instant::now();
                    let record = process_unit(&fetcher, &extractor, &request, timeout).await;
                    reporter.report(BatchEvent::UnitCompleted {
                        batch_id,
                        index: request.index,
                        url: &request.url,
                        outcome: record.outcome_kind(),
                        elapsed: unit_started.elapsed(),
                    });
                    record
                })
            })
            .collect();

        let results: Vec<ResultRecord> = join_all(handles)
            .await
            .into_iter()
            .zip(urls)
            .enumerate()
            .map(|(index, (joined, url))| match joined {
                Ok(record) => record,
                Err(e) => {
                    let record = ResultRecord::failure(url.as_str(), aborted(&e));
                    self.reporter.report(BatchEvent::UnitCompleted {
                        batch_id,
                        index,
                        url,
                        outcome: record.outcome_kind(),
                        elapsed: started.elapsed(),
                    });
                    record
                }
            })
            .collect();

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        self.reporter.report(BatchEvent::Finished {
            batch_id,
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            elapsed: started.elapsed(),
        });

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentRecord;
    use crate::testutil::*;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn service(fetcher: MockFetcher) -> BatchService<MockFetcher, MockContentExtractor> {
        BatchService::new(fetcher, MockContentExtractor::passthrough())
            .with_reporter(Arc::new(NullReporter))
    }

    #[tokio::test]
    async fn results_follow_input_order_not_completion_order() {
        let fetcher = MockFetcher::new("<p>default</p>")
            .with_delayed_route("https://a.example/1", ok_html("first"), Duration::from_millis(150))
            .with_delayed_route("https://b.example/2", ok_html("second"), Duration::from_millis(75))
            .with_route("https://c.example/3", ok_html("third"));
        let svc = service(fetcher);

        let input = urls(&["https://a.example/1", "https://b.example/2", "https://c.example/3"]);
        let results = svc.run(&input, &BatchConfig::default()).await.unwrap();

        assert_eq!(results.len(), 3);
        let bodies: Vec<_> = results
            .iter()
            .map(|r| r.content().unwrap().body_text.as_str())
            .collect();
        assert_eq!(bodies, vec!["first", "second", "third"]);
        for (record, url) in results.iter().zip(&input) {
            assert_eq!(record.url(), url);
        }
    }

    #[tokio::test]
    async fn every_record_has_exactly_one_side() {
        let fetcher = MockFetcher::new("<p>ok</p>")
            .with_route(
                "https://down.example/x",
                FetchOutcome::failure(FetchErrorKind::Connection, "connection refused"),
            )
            .with_route("https://empty.example/y", ok_html(""));
        let svc = service(fetcher);

        let input = urls(&[
            "https://up.example/a",
            "https://down.example/x",
            "https://empty.example/y",
            "https://up.example/b",
        ]);
        let results = svc.run(&input, &BatchConfig::default()).await.unwrap();

        assert_eq!(results.len(), input.len());
        for record in &results {
            assert!(record.content().is_some() ^ record.error().is_some());
        }
    }

    #[tokio::test]
    async fn failures_are_isolated_per_url() {
        let fetcher = MockFetcher::new("<p>fine</p>")
            .with_route(
                "https://missing.example/404",
                FetchOutcome::failure(FetchErrorKind::HttpStatus, "404"),
            )
            .with_route("https://blank.example/page", ok_html("   "));
        let svc = service(fetcher);

        let input = urls(&[
            "https://ok.example/1",
            "https://missing.example/404",
            "https://blank.example/page",
            "https://ok.example/2",
        ]);
        let results = svc.run(&input, &BatchConfig::default()).await.unwrap();

        assert!(results[0].is_success());
        assert_eq!(
            results[1].error(),
            Some(&ErrorDescriptor::Fetch {
                kind: FetchErrorKind::HttpStatus,
                message: "404".into(),
            })
        );
        assert!(matches!(
            results[2].error(),
            Some(ErrorDescriptor::Extraction { .. })
        ));
        assert!(results[3].is_success());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_ceiling_is_respected() {
        let fetcher = MockFetcher::new("<p>slow</p>").with_default_delay(Duration::from_millis(40));
        let svc = service(fetcher.clone());

        let input: Vec<String> = (0..12).map(|i| format!("https://site.example/{i}")).collect();
        let config = BatchConfig::new(3, Duration::from_secs(5));
        let results = svc.run(&input, &config).await.unwrap();

        assert_eq!(results.len(), 12);
        assert!(results.iter().all(|r| r.is_success()));
        let max = fetcher.max_in_flight();
        assert!(max <= 3, "observed {max} concurrent fetches with a limit of 3");
        assert!(max >= 1);
    }

    #[tokio::test]
    async fn timeout_is_a_failure_that_does_not_hold_back_siblings() {
        let fetcher = MockFetcher::new("<p>quick</p>").with_delayed_route(
            "https://timeout.example/b",
            ok_html("never"),
            Duration::from_secs(30),
        );
        let svc = service(fetcher);

        let input = urls(&[
            "https://good.example/a",
            "https://timeout.example/b",
            "https://good.example/c",
        ]);
        let config = BatchConfig::new(4, Duration::from_millis(100));

        let start = Instant::now();
        let results = svc.run(&input, &config).await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));

        assert!(results[0].is_success());
        assert!(matches!(
            results[1].error(),
            Some(ErrorDescriptor::Fetch {
                kind: FetchErrorKind::Timeout,
                ..
            })
        ));
        assert!(results[2].is_success());
    }

    #[tokio::test]
    async fn panicking_unit_is_recorded_without_affecting_others() {
        let fetcher = MockFetcher::new("<p>fine</p>")
            .with_route("https://boom.example/x", ok_html(PANIC_MARKER));
        let reporter = MockReporter::new();
        let svc = BatchService::new(fetcher, MockContentExtractor::panicking_on(PANIC_MARKER))
            .with_reporter(Arc::new(reporter.clone()));

        let input = urls(&["https://ok.example/1", "https://boom.example/x", "https://ok.example/2"]);
        let results = svc.run(&input, &BatchConfig::default()).await.unwrap();

        let events = reporter.events.lock().unwrap().clone();
        let units = events.iter().filter(|e| *e == "UnitCompleted").count();
        assert_eq!(units, results.len());
        assert_eq!(events.first().map(String::as_str), Some("Started"));
        assert_eq!(events.last().map(String::as_str), Some("Finished"));

        assert!(results[0].is_success());
        assert_eq!(results[1].url(), "https://boom.example/x");
        assert!(matches!(
            results[1].error(),
            Some(ErrorDescriptor::Fetch {
                kind: FetchErrorKind::Unknown,
                ..
            })
        ));
        assert!(results[2].is_success());
    }

    #[tokio::test]
    async fn bare_hosts_are_normalized_but_reported_as_given() {
        let fetcher = MockFetcher::new("<p>hi</p>");
        let svc = service(fetcher.clone());

        let input = urls(&["example.com/page"]);
        let results = svc.run(&input, &BatchConfig::default()).await.unwrap();

        assert_eq!(results[0].url(), "example.com/page");
        assert_eq!(fetcher.calls(), vec!["https://example.com/page".to_string()]);
    }

    #[tokio::test]
    async fn invalid_input_fails_before_any_fetch() {
        let fetcher = MockFetcher::new("<p>hi</p>");
        let svc = service(fetcher.clone());

        let input = urls(&["https://ok.example/a", "   "]);
        let err = svc.run(&input, &BatchConfig::default()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(err.to_string().contains("position 1"));
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn zero_concurrency_is_rejected() {
        let svc = service(MockFetcher::new("<p>hi</p>"));
        let err = svc
            .run(&urls(&["https://ok.example/a"]), &BatchConfig::default().with_concurrency_limit(0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let svc = service(MockFetcher::new("<p>hi</p>"));
        let results = svc.run(&[], &BatchConfig::default()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn repeated_runs_fetch_again() {
        let fetcher = MockFetcher::new("<p>hi</p>");
        let svc = service(fetcher.clone());
        let input = urls(&["https://a.example/1", "https://b.example/2"]);

        svc.run(&input, &BatchConfig::default()).await.unwrap();
        svc.run(&input, &BatchConfig::default()).await.unwrap();

        assert_eq!(fetcher.calls().len(), 4);
    }

    #[tokio::test]
    async fn reporter_sees_every_unit() {
        let reporter = Arc::new(MockReporter::new());
        let svc = BatchService::new(
            MockFetcher::new("<p>hi</p>").with_route(
                "https://bad.example/x",
                FetchOutcome::failure(FetchErrorKind::Unknown, "boom"),
            ),
            MockContentExtractor::passthrough(),
        )
        .with_reporter(reporter.clone());

        let input = urls(&["https://a.example/1", "https://bad.example/x"]);
        svc.run(&input, &BatchConfig::default()).await.unwrap();

        let events = reporter.events.lock().unwrap().clone();
        assert_eq!(events.first().map(String::as_str), Some("Started"));
        assert_eq!(events.last().map(String::as_str), Some("Finished"));
        assert_eq!(events.iter().filter(|e| *e == "UnitCompleted").count(), 2);
    }

    #[tokio::test]
    async fn process_unit_skips_extraction_on_fetch_failure() {
        let fetcher = MockFetcher::new("<p>hi</p>").with_route(
            "https://x.example/a",
            FetchOutcome::failure(FetchErrorKind::Connection, "dns error"),
        );
        let request = FetchRequest {
            index: 0,
            url: "x.example/a".into(),
            target: "https://x.example/a".into(),
        };
        let record = process_unit(
            &fetcher,
            &MockContentExtractor::panicking_on("<p>hi</p>"),
            &request,
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(record.url(), "x.example/a");
        assert_eq!(
            record.outcome_kind(),
            OutcomeKind::Fetch(FetchErrorKind::Connection)
        );
    }

    #[test]
    fn default_config_is_sensible() {
        let config = BatchConfig::default();
        assert_eq!(config.concurrency_limit, 10);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
        assert!(BatchConfig::new(1, Duration::ZERO).validate().is_err());
    }

    #[test]
    fn content_record_from_passthrough_mock() {
        let record = MockContentExtractor::passthrough().extract("  hello ").unwrap();
        assert_eq!(
            record,
            ContentRecord {
                title: None,
                meta_description: None,
                body_text: "hello".into(),
            }
        );
    }
}
