//! HTML parsing and text extraction

use super::{normalize_whitespace, ExtractedLink, ParsedPage};
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Parse an HTML page into its title, body text and outgoing links
pub fn parse_html(content: &str, base_url: Option<&str>) -> ParsedPage {
    let document = Html::parse_document(content);

    let title = first_title(&document);

    let body_text = Selector::parse("body")
        .ok()
        .and_then(|s| document.select(&s).next())
        .map(visible_text)
        .unwrap_or_default();

    let mut links = Vec::new();
    if let Ok(selector) = Selector::parse("a[href]") {
        let base = base_url.and_then(|u| Url::parse(u).ok());

        for elem in document.select(&selector) {
            let Some(href) = elem.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            if href.is_empty() {
                continue;
            }

            let link_text = elem.text().collect::<String>().trim().to_string();
            let link_text = if link_text.is_empty() {
                None
            } else {
                Some(link_text)
            };

            // Resolve relative URLs
            let url = match base {
                Some(ref base) => base
                    .join(href)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| href.to_string()),
                None => href.to_string(),
            };

            let is_internal = match base {
                Some(ref base) => Url::parse(&url)
                    .map(|link_url| link_url.host() == base.host())
                    .unwrap_or(false),
                None => !href.contains("://"),
            };

            links.push(ExtractedLink {
                url,
                text: link_text,
                is_internal,
            });
        }
    }

    ParsedPage {
        title,
        body_text: normalize_whitespace(&body_text),
        links,
    }
}

/// Text of the first `<title>` element, or an empty string
pub fn extract_title(content: &str) -> String {
    let document = Html::parse_document(content);
    first_title(&document).unwrap_or_default()
}

/// Whole-document text with markup removed
pub fn strip_tags(content: &str) -> String {
    let document = Html::parse_document(content);
    normalize_whitespace(&visible_text(document.root_element()))
}

/// A window of `radius` whitespace-delimited tokens around the first token
/// containing `needle` (case-sensitive), or `"..."` when nothing matches.
pub fn snippet(content: &str, needle: &str, radius: usize) -> String {
    let text = strip_tags(content);
    let tokens: Vec<&str> = text.split_whitespace().collect();

    match tokens.iter().position(|t| t.contains(needle)) {
        Some(i) => {
            let start = i.saturating_sub(radius);
            let end = (i + radius).min(tokens.len());
            tokens[start..end].join(" ")
        }
        None => "...".to_string(),
    }
}

fn first_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
}

/// Concatenated text nodes, skipping script and style contents
fn visible_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| e.name()))
            .map(|name| matches!(name, "script" | "style" | "noscript"))
            .unwrap_or(false);
        if hidden {
            continue;
        }
        out.push_str(text);
        out.push(' ');
    }
    out
}
