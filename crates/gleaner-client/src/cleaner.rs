use std::sync::Arc;

use gleaner_core::error::AppError;
use gleaner_core::traits::Cleaner;
use htmd::HtmlToMarkdown;

/// Markdown handed to the LLM is cut off after this many characters.
pub const DEFAULT_MAX_CHARS: usize = 60_000;

/// HTML-to-Markdown cleaner using htmd.
///
/// Converts raw HTML into Markdown, stripping non-content elements (script,
/// style, nav, etc.) and capping the result so a bloated page does not blow
/// the model's context window.
#[derive(Clone)]
pub struct HtmdCleaner {
    converter: Arc<HtmlToMarkdown>,
    max_chars: usize,
}

impl HtmdCleaner {
    pub fn new() -> Self {
        let converter = HtmlToMarkdown::builder()
            .skip_tags(vec![
                "script", "style", "nav", "footer", "header", "aside", "noscript", "iframe", "svg",
                "form", "template",
            ])
            .build();

        Self {
            converter: Arc::new(converter),
            max_chars: DEFAULT_MAX_CHARS,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

impl Default for HtmdCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl Cleaner for HtmdCleaner {
    fn clean(&self, html: &str) -> Result<String, AppError> {
        let markdown = self
            .converter
            .convert(html)
            .map_err(|e| AppError::CleanerError(e.to_string()))?;

        let mut markdown = squeeze_blank_lines(&markdown);
        if let Some((cut, _)) = markdown.char_indices().nth(self.max_chars) {
            tracing::debug!(
                from = markdown.len(),
                to = cut,
                "Truncating cleaned content"
            );
            markdown.truncate(cut);
        }
        Ok(markdown)
    }
}

/// Collapse runs of blank lines into a single blank line.
fn squeeze_blank_lines(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut blank_run = 0;
    for line in markdown.trim().lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out.truncate(out.trim_end().len());
    out
}
