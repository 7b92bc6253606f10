use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::AppError;

/// Column read when the caller does not name one.
pub const DEFAULT_URL_COLUMN: &str = "URL";

/// Read the URLs in `column` of a CSV document, preserving row order.
///
/// Cells are trimmed and blank cells are skipped. Rows may have differing
/// lengths; a row too short to reach `column` counts as blank.
pub fn read_urls<R: Read>(reader: R, column: &str) -> Result<Vec<String>, AppError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let position = headers.iter().position(|h| h == column).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "Column '{column}' not found (available: {})",
            headers.iter().collect::<Vec<_>>().join(", ")
        ))
    })?;

    let mut urls = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        match record.get(position) {
            Some(cell) if !cell.is_empty() => urls.push(cell.to_string()),
            _ => tracing::debug!(row = row + 1, "Skipping blank URL cell"),
        }
    }

    tracing::info!(count = urls.len(), %column, "Loaded URLs");
    Ok(urls)
}

/// [`read_urls`] on a file path.
pub fn read_urls_from_path(path: &Path, column: &str) -> Result<Vec<String>, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::InvalidInput(format!("Failed to open URL file {}: {e}", path.display()))
    })?;
    read_urls(file, column)
}
