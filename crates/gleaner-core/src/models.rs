use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ExtractionError;

/// One unit of batch work: the input URL plus its position in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Position of the URL in the caller's input list.
    pub index: usize,
    /// The URL exactly as supplied by the caller.
    pub url: String,
    /// Normalized absolute http(s) URL handed to the fetcher.
    pub target: String,
}

/// Why a fetch did not produce a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// The server answered with a non-2xx status.
    HttpStatus,
    /// DNS, TCP or TLS failure before a response arrived.
    Connection,
    /// The request did not complete within its deadline.
    Timeout,
    /// Any other transport-level fault.
    Unknown,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::HttpStatus => "http_status",
            FetchErrorKind::Connection => "connection",
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http_status" => Ok(FetchErrorKind::HttpStatus),
            "connection" => Ok(FetchErrorKind::Connection),
            "timeout" => Ok(FetchErrorKind::Timeout),
            "unknown" => Ok(FetchErrorKind::Unknown),
            other => Err(format!("Unknown fetch error kind: {other}")),
        }
    }
}

/// Result of a single fetch attempt. Produced exactly once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success { html: String },
    Failure { kind: FetchErrorKind, message: String },
}

impl FetchOutcome {
    pub fn failure(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        FetchOutcome::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }
}

/// Normalized readable content of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    /// Visible text of the main content region, one line per text node.
    #[serde(rename = "text")]
    pub body_text: String,
}

/// Describes why a URL has no content record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ErrorDescriptor {
    Fetch {
        kind: FetchErrorKind,
        message: String,
    },
    Extraction {
        message: String,
    },
}

impl fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDescriptor::Fetch { kind, message } => {
                write!(f, "Fetch failed ({kind}): {message}")
            }
            ErrorDescriptor::Extraction { message } => {
                write!(f, "Error extracting content: {message}")
            }
        }
    }
}

impl From<ExtractionError> for ErrorDescriptor {
    fn from(err: ExtractionError) -> Self {
        ErrorDescriptor::Extraction { message: err.0 }
    }
}

/// Coarse classification of a finished unit, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    Fetch(FetchErrorKind),
    Extraction,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Success => f.write_str("success"),
            OutcomeKind::Fetch(kind) => write!(f, "fetch_{kind}"),
            OutcomeKind::Extraction => f.write_str("extraction"),
        }
    }
}

/// Final per-URL output of a batch run.
///
/// Holds either a content record or an error, never both and never neither.
/// The fields are private so that the only ways in are [`ResultRecord::success`]
/// and [`ResultRecord::failure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<ContentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorDescriptor>,
}

impl ResultRecord {
    pub fn success(url: impl Into<String>, content: ContentRecord) -> Self {
        Self {
            url: url.into(),
            content: Some(content),
            error: None,
        }
    }

    pub fn failure(url: impl Into<String>, error: ErrorDescriptor) -> Self {
        Self {
            url: url.into(),
            content: None,
            error: Some(error),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content(&self) -> Option<&ContentRecord> {
        self.content.as_ref()
    }

    pub fn error(&self) -> Option<&ErrorDescriptor> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.content.is_some()
    }

    pub fn outcome_kind(&self) -> OutcomeKind {
        match &self.error {
            None => OutcomeKind::Success,
            Some(ErrorDescriptor::Fetch { kind, .. }) => OutcomeKind::Fetch(*kind),
            Some(ErrorDescriptor::Extraction { .. }) => OutcomeKind::Extraction,
        }
    }

    /// Content text for flat outputs: the body text, or the error string.
    pub fn content_or_error_text(&self) -> String {
        match (&self.content, &self.error) {
            (Some(content), _) => content.body_text.clone(),
            (None, Some(error)) => error.to_string(),
            (None, None) => String::new(),
        }
    }

    pub fn into_parts(self) -> (String, Result<ContentRecord, ErrorDescriptor>) {
        let outcome = match (self.content, self.error) {
            (Some(content), _) => Ok(content),
            (None, Some(error)) => Err(error),
            (None, None) => Err(ErrorDescriptor::Fetch {
                kind: FetchErrorKind::Unknown,
                message: "result record carried no outcome".to_string(),
            }),
        };
        (self.url, outcome)
    }
}

/// A live-music event pulled out of a page by the structured extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub band_name: String,
    #[serde(deserialize_with = "deserialize_event_date")]
    pub date: DateTime<Utc>,
    pub venue: String,
    pub description: String,
}

/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC),
/// and bare `YYYY-MM-DD` dates (midnight UTC).
fn deserialize_event_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_event_date(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("unrecognised event date: {raw}"))
    })
}

pub fn parse_event_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
