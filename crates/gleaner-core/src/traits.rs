use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, ExtractionError};
use crate::models::{ContentRecord, Event, FetchOutcome, ResultRecord};

/// Fetches raw HTML content from a URL.
///
/// Implementations must fold every failure mode into
/// [`FetchOutcome::Failure`]; nothing escapes as a panic or error.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str, timeout: Duration) -> impl Future<Output = FetchOutcome> + Send;
}

/// Reduces one HTML document to its readable content.
pub trait ContentExtractor: Send + Sync + Clone {
    fn extract(&self, html: &str) -> Result<ContentRecord, ExtractionError>;
}

/// Converts raw HTML into clean Markdown text.
pub trait Cleaner: Send + Sync + Clone {
    fn clean(&self, html: &str) -> Result<String, AppError>;
}

/// Extracts event records from text content using an LLM.
pub trait Extractor: Send + Sync + Clone {
    fn extract(&self, content: &str) -> impl Future<Output = Result<Vec<Event>, AppError>> + Send;
}

/// Turns a URL into structured event records.
pub trait StructuredExtractor: Send + Sync + Clone {
    fn extract_structured(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Vec<Event>, AppError>> + Send;
}

/// Destination for the ordered results of a batch run.
pub trait ResultSink {
    fn write_record(&mut self, record: &ResultRecord) -> Result<(), AppError>;

    fn finish(&mut self) -> Result<(), AppError> {
        Ok(())
    }

    fn write_all(&mut self, records: &[ResultRecord]) -> Result<(), AppError> {
        for record in records {
            self.write_record(record)?;
        }
        self.finish()
    }
}
