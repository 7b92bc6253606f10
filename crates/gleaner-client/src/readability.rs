//! Readability-style main content extraction on top of `scraper`.
//!
//! Paragraph-like blocks vote for their parent (full score) and grandparent
//! (half score). The best container, after penalizing link-heavy ones, is the
//! main region. Pages with no qualifying paragraphs fall back to the first
//! `<article>`, `<main>`, `[role=main]` or `<body>`.

use std::collections::HashMap;

use gleaner_core::error::ExtractionError;
use gleaner_core::models::ContentRecord;
use gleaner_core::traits::ContentExtractor;
use scraper::node::Element;
use scraper::{ElementRef, Html, Node};

const DEFAULT_MIN_PARAGRAPH_CHARS: usize = 25;

/// Elements whose subtree never contributes visible body text.
const NON_CONTENT_TAGS: &[&str] = &[
    "head", "title", "meta", "link", "script", "style", "noscript", "template", "iframe", "svg",
    "canvas", "nav", "header", "footer", "aside", "form", "button", "select", "dialog",
];

const BOILERPLATE_ROLES: &[&str] = &[
    "navigation",
    "banner",
    "contentinfo",
    "complementary",
    "search",
];

const UNLIKELY_HINTS: &[&str] = &[
    "ad-break",
    "advert",
    "agegate",
    "breadcrumb",
    "combx",
    "comment",
    "cookie",
    "disqus",
    "gdpr",
    "menu",
    "modal",
    "newsletter",
    "pager",
    "pagination",
    "popup",
    "promo",
    "related",
    "share",
    "sidebar",
    "social",
    "sponsor",
    "subscribe",
];

const MAYBE_HINTS: &[&str] = &["article", "body", "column", "content", "main", "shadow"];

const POSITIVE_HINTS: &[&str] = &[
    "article", "blog", "body", "content", "entry", "main", "page", "post", "story", "text",
];

const NEGATIVE_HINTS: &[&str] = &[
    "banner", "comment", "contact", "foot", "masthead", "media", "meta", "promo", "related",
    "share", "sidebar", "sponsor", "tags", "tool", "widget",
];

const PARAGRAPH_TAGS: &[&str] = &["p", "pre", "blockquote"];

/// Containers that are never dropped on class/id hints alone.
const STRUCTURAL_TAGS: &[&str] = &["html", "body", "article", "main"];

const CLASS_WEIGHT: f64 = 25.0;

/// Heuristic main-content extractor.
///
/// Stateless and cheap to clone; one instance is shared by every batch unit.
#[derive(Debug, Clone)]
pub struct ReadabilityExtractor {
    min_paragraph_chars: usize,
}

impl ReadabilityExtractor {
    pub fn new() -> Self {
        Self {
            min_paragraph_chars: DEFAULT_MIN_PARAGRAPH_CHARS,
        }
    }

    /// Paragraphs shorter than this (after whitespace collapsing) cast no vote.
    pub fn with_min_paragraph_chars(mut self, chars: usize) -> Self {
        self.min_paragraph_chars = chars;
        self
    }

    fn main_region<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        let root = document.root_element();
        self.best_candidate(root).or_else(|| fallback_region(root))
    }

    fn best_candidate<'a>(&self, root: ElementRef<'a>) -> Option<ElementRef<'a>> {
        let mut candidates: Vec<(ElementRef<'a>, f64)> = Vec::new();
        let mut positions = HashMap::new();

        for node in root.descendants() {
            let Some(paragraph) = ElementRef::wrap(node) else {
                continue;
            };
            if !PARAGRAPH_TAGS.contains(&paragraph.value().name()) || is_excluded(paragraph) {
                continue;
            }

            let text = collapsed_text(paragraph);
            let chars = text.chars().count();
            if chars < self.min_paragraph_chars {
                continue;
            }
            let score =
                1.0 + text.matches(',').count() as f64 + (chars as f64 / 100.0).floor().min(3.0);

            let parent = paragraph.parent().and_then(ElementRef::wrap);
            let grandparent = parent.and_then(|p| p.parent()).and_then(ElementRef::wrap);
            for (container, share) in [(parent, score), (grandparent, score / 2.0)] {
                let Some(container) = container else {
                    continue;
                };
                let slot = *positions.entry(container.id()).or_insert_with(|| {
                    candidates.push((container, class_weight(container.value())));
                    candidates.len() - 1
                });
                candidates[slot].1 += share;
            }
        }

        let mut best: Option<(ElementRef<'a>, f64)> = None;
        for (candidate, score) in candidates {
            let adjusted = score * (1.0 - link_density(candidate));
            if adjusted <= 0.0 {
                continue;
            }
            match best {
                Some((_, top)) if top >= adjusted => {}
                _ => best = Some((candidate, adjusted)),
            }
        }

        if let Some((candidate, score)) = best {
            tracing::trace!(tag = candidate.value().name(), score, "Selected content region");
        }
        best.map(|(candidate, _)| candidate)
    }
}

impl Default for ReadabilityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentExtractor for ReadabilityExtractor {
    fn extract(&self, html: &str) -> Result<ContentRecord, ExtractionError> {
        if html.trim().is_empty() {
            return Err(ExtractionError::new("empty document"));
        }

        let document = Html::parse_document(html);
        let title = document_title(&document);
        let meta_description = meta_description(&document);

        let region = self
            .main_region(&document)
            .ok_or_else(|| ExtractionError::new("document has no body"))?;

        let mut lines = Vec::new();
        collect_lines(region, &mut lines);
        if lines.is_empty() {
            return Err(ExtractionError::new("no readable content found"));
        }

        Ok(ContentRecord {
            title,
            meta_description,
            body_text: lines.join("\n"),
        })
    }
}

// ---------------------------------------------------------------------------
// Region selection
// ---------------------------------------------------------------------------

fn fallback_region(root: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let elements = || {
        root.descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| !is_excluded(*el))
    };

    elements()
        .find(|el| el.value().name() == "article")
        .or_else(|| elements().find(|el| el.value().name() == "main"))
        .or_else(|| elements().find(|el| el.value().attr("role") == Some("main")))
        .or_else(|| elements().find(|el| el.value().name() == "body"))
        .or(Some(root))
}

fn class_weight(element: &Element) -> f64 {
    let hints = hint_string(element);
    let mut weight = 0.0;
    if NEGATIVE_HINTS.iter().any(|h| hints.contains(h)) {
        weight -= CLASS_WEIGHT;
    }
    if POSITIVE_HINTS.iter().any(|h| hints.contains(h)) {
        weight += CLASS_WEIGHT;
    }
    weight
}

fn link_density(element: ElementRef<'_>) -> f64 {
    let total = collapsed_text(element).chars().count();
    if total == 0 {
        return 0.0;
    }
    let linked: usize = element
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "a")
        .map(|a| collapsed_text(a).chars().count())
        .sum();
    (linked as f64 / total as f64).min(1.0)
}

// ---------------------------------------------------------------------------
// Boilerplate detection
// ---------------------------------------------------------------------------

/// True if the element or any ancestor is boilerplate.
fn is_excluded(element: ElementRef<'_>) -> bool {
    is_boilerplate(element.value())
        || element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| is_boilerplate(ancestor.value()))
}

fn is_boilerplate(element: &Element) -> bool {
    NON_CONTENT_TAGS.contains(&element.name())
        || element
            .attr("role")
            .is_some_and(|role| BOILERPLATE_ROLES.contains(&role.trim().to_ascii_lowercase().as_str()))
        || is_hidden(element)
        || is_unlikely(element)
}

fn is_hidden(element: &Element) -> bool {
    if element.attr("hidden").is_some() || element.attr("aria-hidden") == Some("true") {
        return true;
    }
    element.attr("style").is_some_and(|style| {
        let style: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

fn is_unlikely(element: &Element) -> bool {
    if STRUCTURAL_TAGS.contains(&element.name()) {
        return false;
    }
    let hints = hint_string(element);
    UNLIKELY_HINTS.iter().any(|h| hints.contains(h))
        && !MAYBE_HINTS.iter().any(|h| hints.contains(h))
}

fn hint_string(element: &Element) -> String {
    let class = element.attr("class").unwrap_or_default();
    let id = element.attr("id").unwrap_or_default();
    format!("{class} {id}").to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collapsed_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// One line per visible text node under `element`, boilerplate skipped.
fn collect_lines(element: ElementRef<'_>, lines: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let line = collapse_whitespace(text);
                if !line.is_empty() {
                    lines.push(line);
                }
            }
            Node::Element(el) if !is_boilerplate(el) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_lines(child, lines);
                }
            }
            _ => {}
        }
    }
}

fn document_title(document: &Html) -> Option<String> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| {
            el.value().name() == "title"
                && !el
                    .ancestors()
                    .filter_map(ElementRef::wrap)
                    .any(|a| a.value().name() == "svg")
        })
        .map(collapsed_text)
        .filter(|title| !title.is_empty())
}

fn meta_description(document: &Html) -> Option<String> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "meta")
        .find(|el| {
            el.value()
                .attr("name")
                .is_some_and(|name| name.trim().eq_ignore_ascii_case("description"))
        })
        .and_then(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .filter(|description| !description.is_empty())
}
