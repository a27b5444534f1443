//! Candidate URL checks applied before a link is queued or persisted

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

const MIN_URL_LEN: usize = 10;
const MAX_URL_LEN: usize = 2048;

const BINARY_EXTENSIONS: [&str; 4] = [".pdf", ".zip", ".rar", ".exe"];

fn url_shape() -> Option<&'static Regex> {
    static SHAPE: OnceLock<Option<Regex>> = OnceLock::new();
    SHAPE
        .get_or_init(|| {
            Regex::new(r"^https?://[-a-zA-Z0-9+&@#/%?=~_|!:,.;]*[-a-zA-Z0-9+&@#/%=~_|]$").ok()
        })
        .as_ref()
}

/// Lenient check: length bounds, http(s) scheme, no binary document
/// extension, absolute-URL shape with a host.
pub fn is_valid(url: &str) -> bool {
    if url.len() < MIN_URL_LEN || url.len() > MAX_URL_LEN {
        return false;
    }

    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return false;
    }

    let path = parsed.path().to_ascii_lowercase();
    if BINARY_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return false;
    }

    url_shape().is_some_and(|re| re.is_match(url))
}

/// Strict check used while crawling: everything [`is_valid`] requires,
/// and additionally no fragment, query string or percent-encoding.
pub fn is_crawlable(url: &str) -> bool {
    is_valid(url) && !url.contains(&['#', '?', '%'][..])
}
