use std::time::Duration;

use crate::error::AppError;
use crate::models::{Event, FetchOutcome};
use crate::traits::{Cleaner, Extractor, Fetcher, StructuredExtractor};
use crate::util::normalize_url;

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Orchestrates the structured pipeline for one URL: fetch → clean → extract.
///
/// Generic over all external dependencies via traits, enabling dependency injection
/// and testability without real HTTP or LLM calls. Unlike the batch pipeline,
/// any failure here is returned to the caller as an error.
#[derive(Clone)]
pub struct StructuredService<F, C, E>
where
    F: Fetcher,
    C: Cleaner,
    E: Extractor,
{
    fetcher: F,
    cleaner: C,
    extractor: E,
    timeout: Duration,
}

impl<F, C, E> StructuredService<F, C, E>
where
    F: Fetcher,
    C: Cleaner,
    E: Extractor,
{
    pub fn new(fetcher: F, cleaner: C, extractor: E) -> Self {
        Self {
            fetcher,
            cleaner,
            extractor,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Deadline for the page fetch (the LLM call has its own).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl<F, C, E> StructuredExtractor for StructuredService<F, C, E>
where
    F: Fetcher,
    C: Cleaner,
    E: Extractor,
{
    async fn extract_structured(&self, url: &str) -> Result<Vec<Event>, AppError> {
        let target = normalize_url(url)?;

        // 1. Fetch
        tracing::info!("Fetching {}", target);
        let html = match self.fetcher.fetch(&target, self.timeout).await {
            FetchOutcome::Success { html } => html,
            FetchOutcome::Failure { kind, message } => {
                return Err(AppError::FetchFailed { kind, message });
            }
        };
        tracing::info!("Fetched {} bytes of HTML", html.len());

        // 2. Clean
        let markdown = self.cleaner.clean(&html)?;
        tracing::info!(
            "Cleaned to {} bytes of Markdown ({}% reduction)",
            markdown.len(),
            if html.is_empty() {
                0
            } else {
                100usize.saturating_sub(markdown.len() * 100 / html.len())
            }
        );

        // 3. Extract
        let events = self.extractor.extract(&markdown).await?;
        tracing::info!(url = %target, events = events.len(), "Structured extraction complete");

        Ok(events)
    }
}
