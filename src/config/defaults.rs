//! Default values for configuration

/// Default user agent sent with every request
pub fn default_crawl_user_agent() -> String {
    format!("lemmasearch/{} (+https://github.com/sealad886)", env!("CARGO_PKG_VERSION"))
}

/// Default referrer header
pub fn default_crawl_referrer() -> String {
    "https://www.google.com".to_string()
}

/// Per-request timeout in seconds
pub fn default_crawl_timeout() -> u64 {
    10
}

/// Wall-clock budget for a whole crawl run in seconds
pub fn default_crawl_run_timeout() -> u64 {
    60
}

/// Grace period for in-flight fetches after a stop, in seconds
pub fn default_crawl_shutdown_grace() -> u64 {
    60
}

/// Maximum recursion depth from the seed page
pub fn default_crawl_max_depth() -> u32 {
    10
}

/// Maximum accepted links expanded from one page
pub fn default_crawl_max_links_per_page() -> usize {
    10
}

/// Concurrent fetches (0 = host CPU count)
pub fn default_crawl_concurrency() -> usize {
    0
}

/// Global requests per second (0 = unlimited)
pub fn default_crawl_requests_per_second() -> u32 {
    0
}

/// Attempts made when fetching content for persistence
pub fn default_crawl_fetch_retries() -> u32 {
    3
}

/// Backoff unit between fetch attempts, multiplied by the remaining retries
pub fn default_crawl_retry_backoff_ms() -> u64 {
    1000
}

/// Redirects followed per request
pub fn default_crawl_max_redirects() -> usize {
    5
}

/// Minimum token length handed to the morphology analyzer
pub fn default_lemma_min_word_chars() -> usize {
    3
}

/// Width of the per-pair upsert worker pool
pub fn default_index_upsert_workers() -> usize {
    4
}

/// Attempts for an upsert that lost a write race
pub fn default_index_conflict_retries() -> u32 {
    5
}

/// Results per page when the caller gives no limit
pub fn default_search_limit() -> usize {
    20
}

/// Upper bound on a requested page size
pub fn default_search_max_limit() -> usize {
    100
}

/// Tokens on each side of the matched word in snippets
pub fn default_search_snippet_radius() -> usize {
    5
}

/// Weight of a title occurrence
pub fn default_title_weight() -> f64 {
    1.0
}

/// Weight of a body occurrence
pub fn default_body_weight() -> f64 {
    0.8
}

/// Flush completed indexing sessions to the database
pub fn default_history_persist() -> bool {
    true
}
