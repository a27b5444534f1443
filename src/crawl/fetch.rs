//! HTTP fetching with an optional global rate limit and a retry policy

use crate::config::CrawlConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Raw response for one URL
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub body: String,
    pub content_type: Option<String>,
}

impl FetchedPage {
    pub fn is_blank(&self) -> bool {
        self.body.trim().is_empty()
    }
}

/// Source of page content
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`; non-2xx responses are errors
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Global request limiter shared by every fetch of one fetcher
pub struct GlobalRateLimiter {
    limiter: DirectLimiter,
}

impl GlobalRateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        Self {
            limiter: RateLimiter::direct(Quota::per_second(rps)),
        }
    }

    /// Wait until a request is allowed
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }
}

/// reqwest-backed fetcher sending the configured user agent and referrer
pub struct HttpFetcher {
    client: Client,
    referrer: String,
    limiter: Option<Arc<GlobalRateLimiter>>,
}

impl HttpFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let limiter = (config.requests_per_second > 0)
            .then(|| Arc::new(GlobalRateLimiter::new(config.requests_per_second)));

        Ok(Self {
            client,
            referrer: config.referrer.clone(),
            limiter,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        if let Some(limiter) = &self.limiter {
            limiter.wait().await;
        }

        debug!("Fetching: {}", url);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::REFERER, &self.referrer)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("HTTP {}: {}", status, url)));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("{}: {}", url, e)))?;

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            body,
            content_type,
        })
    }
}

/// Attempts and backoff for fetches whose content will be persisted
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Delay unit, multiplied by the retries still remaining
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            attempts: config.fetch_retries.max(1),
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// Fetch with retries; a blank body counts as a failed attempt
pub async fn fetch_with_retry(
    fetcher: &dyn PageFetcher,
    url: &str,
    policy: RetryPolicy,
) -> Result<FetchedPage> {
    let mut last_error = Error::Fetch(format!("{}: no attempts made", url));

    for attempt in 1..=policy.attempts {
        match fetcher.fetch(url).await {
            Ok(page) if !page.is_blank() => return Ok(page),
            Ok(_) => {
                last_error = Error::Validation(format!("Blank content at {}", url));
            }
            Err(e) => last_error = e,
        }

        let remaining = policy.attempts - attempt;
        if remaining > 0 {
            warn!(
                "Attempt {}/{} for {} failed: {}; retrying",
                attempt, policy.attempts, url, last_error
            );
            tokio::time::sleep(policy.backoff * remaining).await;
        }
    }

    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> CrawlConfig {
        CrawlConfig {
            user_agent: "lemmasearch-test".to_string(),
            referrer: "https://referrer.test".to_string(),
            timeout_secs: 5,
            retry_backoff_ms: 1,
            ..Default::default()
        }
    }

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html")
    }

    #[tokio::test]
    async fn test_fetch_sends_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("user-agent", "lemmasearch-test"))
            .and(header("referer", "https://referrer.test"))
            .respond_with(html("<p>hi</p>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let page = fetcher
            .fetch(&format!("{}/page", server.uri()))
            .await
            .unwrap();
        assert_eq!(page.status, 200);
        assert_eq!(page.body, "<p>hi</p>");
        assert_eq!(page.content_type.as_deref(), Some("text/html"));
    }

    #[tokio::test]
    async fn test_non_success_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let err = fetcher
            .fetch(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }

    #[tokio::test]
    async fn test_retry_gives_up_on_blank_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blank"))
            .respond_with(html("   "))
            .expect(3)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let policy = RetryPolicy::from_config(&test_config());
        let err = fetch_with_retry(&fetcher, &format!("{}/blank", server.uri()), policy)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_retry_recovers_after_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(html("<p>ok</p>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let policy = RetryPolicy::from_config(&test_config());
        let page = fetch_with_retry(&fetcher, &format!("{}/flaky", server.uri()), policy)
            .await
            .unwrap();
        assert_eq!(page.body, "<p>ok</p>");
    }

    #[tokio::test]
    async fn test_global_rate_limiter_allows_burst() {
        let limiter = GlobalRateLimiter::new(100);
        for _ in 0..10 {
            limiter.wait().await;
        }
    }
}
