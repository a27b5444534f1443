//! Document parsing and text extraction
//!
//! This module handles:
//! - HTML parsing (title, body text, links, snippets)
//! - Per-page lemma weighting via [`ContentProcessor`]

mod content;
mod html;

pub use content::*;
pub use html::*;

/// A parsed HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// Text of the first `<title>` element
    pub title: Option<String>,

    /// Visible text of `<body>`
    pub body_text: String,

    /// Links found in the page, resolved against the page URL
    pub links: Vec<ExtractedLink>,
}

/// A link extracted from a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    /// Absolute URL when a base was known
    pub url: String,

    /// Link text
    pub text: Option<String>,

    /// Whether the link points to the same host
    pub is_internal: bool,
}

/// Collapse runs of whitespace into single spaces and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
