//! Result sinks: serialize an ordered batch result for downstream use.

use std::io::Write;

use serde::Serialize;

use crate::error::AppError;
use crate::models::{ContentRecord, ResultRecord};
use crate::traits::ResultSink;

/// One JSON object per line: `{"URL": ..., "content": ...}`.
///
/// `content` is the content record on success and the error string on
/// failure.
pub struct JsonlSink<W: Write> {
    writer: W,
}

#[derive(Serialize)]
struct JsonlLine<'a> {
    #[serde(rename = "URL")]
    url: &'a str,
    content: JsonlContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum JsonlContent<'a> {
    Record(&'a ContentRecord),
    Error(String),
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for JsonlSink<W> {
    fn write_record(&mut self, record: &ResultRecord) -> Result<(), AppError> {
        let content = match record.content() {
            Some(content) => JsonlContent::Record(content),
            None => JsonlContent::Error(record.content_or_error_text()),
        };
        let line = JsonlLine {
            url: record.url(),
            content,
        };
        serde_json::to_writer(&mut self.writer, &line)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), AppError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Two-column CSV: `URL,content`, where content is the body text or the
/// error string.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Result<Self, AppError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(["URL", "content"])?;
        Ok(Self { writer })
    }

    pub fn into_inner(self) -> Result<W, AppError> {
        self.writer.into_inner().map_err(|e| {
            AppError::IoError(std::io::Error::new(e.error().kind(), e.error().to_string()))
        })
    }
}

impl<W: Write> ResultSink for CsvSink<W> {
    fn write_record(&mut self, record: &ResultRecord) -> Result<(), AppError> {
        self.writer
            .write_record([record.url(), record.content_or_error_text().as_str()])?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), AppError> {
        self.writer.flush()?;
        Ok(())
    }
}
