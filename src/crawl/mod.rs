//! Concurrent same-site crawling
//!
//! This module provides:
//! - Link validation ([`is_valid`], [`is_crawlable`])
//! - HTTP fetching with timeouts, rate limiting and retries
//! - Per-run session state ([`CrawlSession`])
//! - A depth-bounded fork/join crawl over a bounded worker pool

mod fetch;
mod session;
mod validate;

pub use fetch::*;
pub use session::*;
pub use validate::*;

use crate::config::CrawlConfig;
use crate::error::{Error, Result};
use crate::parse::parse_html;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// What one crawl run produced
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub state: CrawlState,
    /// Fetched pages, seed first
    pub pages: Vec<FetchedPage>,
    /// Every accepted same-site link, fetched or not
    pub discovered: Vec<String>,
    /// The wall-clock budget ran out before the pool went idle
    pub timed_out: bool,
}

type FetchTask = Option<(FetchedPage, u32)>;

/// Web crawler
pub struct Crawler {
    fetcher: Arc<dyn PageFetcher>,
    config: CrawlConfig,
}

impl Crawler {
    /// Create a crawler backed by an HTTP client
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_fetcher(Arc::new(fetcher), config))
    }

    pub fn with_fetcher(fetcher: Arc<dyn PageFetcher>, config: CrawlConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn fetcher(&self) -> Arc<dyn PageFetcher> {
        self.fetcher.clone()
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawl the session's seed URL.
    ///
    /// A failed seed fetch fails the run. Failures on any other link only
    /// abandon that branch. The run ends when the pool goes idle, the
    /// session is stopped, or the wall-clock budget elapses; pages fetched
    /// up to that point are returned in every case.
    pub async fn crawl(&self, session: &Arc<CrawlSession>) -> Result<CrawlOutcome> {
        session.begin()?;
        let seed = session.seed().to_string();

        let seed_host = match Url::parse(&seed)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        {
            Some(host) => host,
            None => {
                session.finish(CrawlState::Failed);
                return Err(Error::Validation(format!("Seed URL has no host: {}", seed)));
            }
        };

        session.mark_visited(&seed);
        let seed_page = match self.fetcher.fetch(&seed).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Seed fetch failed for {}: {}", seed, e);
                session.finish(CrawlState::Failed);
                return Err(e);
            }
        };
        session.mark_visited(&seed_page.url);

        let token = session.cancel_token();
        let permits = Arc::new(Semaphore::new(self.config.effective_concurrency()));
        let run_budget = Duration::from_secs(self.config.run_timeout_secs);
        let deadline = Instant::now() + run_budget;

        let mut tasks: JoinSet<FetchTask> = JoinSet::new();
        let mut pages = Vec::new();
        let mut timed_out = false;

        self.expand(session, &seed_page, 0, &seed_host, &mut tasks, &permits, &token);
        pages.push(seed_page);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Crawl of {} stopped with {} pages", seed, pages.len());
                    break;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    warn!(
                        "Crawl of {} reached its {}s budget with {} fetches pending",
                        seed,
                        run_budget.as_secs(),
                        tasks.len()
                    );
                    timed_out = true;
                    break;
                }
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok(Some((page, depth)))) => {
                        self.expand(session, &page, depth, &seed_host, &mut tasks, &permits, &token);
                        pages.push(page);
                    }
                    Some(Ok(None)) => {}
                    Some(Err(e)) => warn!("Fetch task ended abnormally: {}", e),
                },
            }
        }

        self.shutdown(&mut tasks, !timed_out).await;

        let state = session.finish(CrawlState::Completed);
        info!(
            "Crawled {} pages from {} ({} links discovered, {})",
            pages.len(),
            seed,
            session.discovered().len(),
            state
        );

        Ok(CrawlOutcome {
            state,
            pages,
            discovered: session.discovered(),
            timed_out,
        })
    }

    /// Queue the accepted links of `page`. Children sit one level below
    /// their parent; nothing is queued once the parent is at max depth.
    #[allow(clippy::too_many_arguments)]
    fn expand(
        &self,
        session: &Arc<CrawlSession>,
        page: &FetchedPage,
        depth: u32,
        seed_host: &str,
        tasks: &mut JoinSet<FetchTask>,
        permits: &Arc<Semaphore>,
        token: &CancellationToken,
    ) {
        let can_descend = depth < self.config.max_depth;
        let parsed = parse_html(&page.body, Some(&page.url));
        let mut queued = 0usize;

        for link in parsed.links {
            if !link.is_internal || !is_crawlable(&link.url) {
                continue;
            }
            let same_site = Url::parse(&link.url)
                .ok()
                .and_then(|u| u.host_str().map(|h| h.eq_ignore_ascii_case(seed_host)))
                .unwrap_or(false);
            if !same_site {
                continue;
            }

            session.add_discovered(&link.url);

            if !can_descend || queued >= self.config.max_links_per_page {
                continue;
            }
            if !session.mark_visited(&link.url) {
                continue;
            }
            queued += 1;

            debug!("Queueing {} at depth {}", link.url, depth + 1);
            let url = link.url;
            let child_depth = depth + 1;
            let fetcher = self.fetcher.clone();
            let permits = permits.clone();
            let token = token.clone();

            tasks.spawn(async move {
                let _permit = tokio::select! {
                    permit = permits.acquire_owned() => permit.ok()?,
                    _ = token.cancelled() => return None,
                };
                tokio::select! {
                    _ = token.cancelled() => None,
                    fetched = fetcher.fetch(&url) => match fetched {
                        Ok(page) => Some((page, child_depth)),
                        Err(e) => {
                            warn!("Failed to fetch {}: {}", url, e);
                            None
                        }
                    },
                }
            });
        }
    }

    /// Wind down outstanding fetches: after a stop they get the grace period
    /// to observe cancellation, otherwise (or beyond it) they are aborted.
    async fn shutdown(&self, tasks: &mut JoinSet<FetchTask>, graceful: bool) {
        if tasks.is_empty() {
            return;
        }

        if graceful {
            let grace = Duration::from_secs(self.config.shutdown_grace_secs);
            let drained = tokio::time::timeout(grace, async {
                while tasks.join_next().await.is_some() {}
            })
            .await;
            if drained.is_ok() {
                return;
            }
            warn!("Fetch tasks still running after {:?}; aborting", grace);
        }

        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
    }
}
