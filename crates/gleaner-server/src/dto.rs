use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gleaner_core::models::{ContentRecord, ErrorDescriptor, Event, ResultRecord};

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct BatchRequest {
    /// URLs to process; a missing scheme defaults to `https://`.
    pub urls: Vec<String>,
    /// Lowers the server's concurrency ceiling; larger values are capped.
    pub concurrency: Option<usize>,
    /// Lowers the server's per-fetch deadline; larger values are capped.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BatchResponse {
    /// One entry per requested URL, in request order.
    pub results: Vec<ResultResponse>,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ResultResponse {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResultErrorResponse>,
}

impl From<ResultRecord> for ResultResponse {
    fn from(record: ResultRecord) -> Self {
        let (url, outcome) = record.into_parts();
        match outcome {
            Ok(content) => Self {
                url,
                content: Some(content.into()),
                error: None,
            },
            Err(error) => Self {
                url,
                content: None,
                error: Some(error.into()),
            },
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ContentResponse {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub text: String,
}

impl From<ContentRecord> for ContentResponse {
    fn from(content: ContentRecord) -> Self {
        Self {
            title: content.title,
            meta_description: content.meta_description,
            text: content.body_text,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ResultErrorResponse {
    /// `fetch` or `extraction`.
    pub stage: &'static str,
    /// Fetch failure kind: `http_status`, `connection`, `timeout` or `unknown`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub message: String,
}

impl From<ErrorDescriptor> for ResultErrorResponse {
    fn from(error: ErrorDescriptor) -> Self {
        match error {
            ErrorDescriptor::Fetch { kind, message } => Self {
                stage: "fetch",
                kind: Some(kind.to_string()),
                message,
            },
            ErrorDescriptor::Extraction { message } => Self {
                stage: "extraction",
                kind: None,
                message,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ExtractRequest {
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ExtractResponse {
    pub events: Vec<EventResponse>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EventResponse {
    pub band_name: String,
    pub date: DateTime<Utc>,
    pub venue: String,
    pub description: String,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            band_name: event.band_name,
            date: event.date,
            venue: event.venue,
            description: event.description,
        }
    }
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    /// `configured` when `/v1/extract` is available, `disabled` otherwise.
    pub llm: &'static str,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
