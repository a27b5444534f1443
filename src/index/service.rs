//! Full-site indexing runs
//!
//! One run per site at a time. Each run owns a [`CrawlSession`] registered
//! under its site id; stopping a site cancels that session, whichever phase
//! (crawling or indexing) the run is in.

use super::IndexingEngine;
use crate::config::{Config, SiteEntry};
use crate::crawl::{CrawlSession, CrawlState, Crawler, FetchedPage, HttpFetcher, PageFetcher, RetryPolicy};
use crate::error::{Error, Result};
use crate::history::{HistorySink, Notifications};
use crate::lemma::Lemmatizer;
use crate::parse::{ContentProcessor, FieldWeights};
use crate::progress::{advance_progress, finish_progress, start_progress};
use crate::store::{Page, Site, SiteStatus, Store};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const STOPPED_BY_USER: &str = "Indexing stopped by user";

/// Outcome of one site's indexing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingReport {
    pub site_id: i64,
    pub site_url: String,
    pub status: SiteStatus,
    pub session_id: Uuid,
    pub pages_indexed: usize,
    pub pages_failed: usize,
    pub links_discovered: usize,
    pub timed_out: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalStatistics {
    pub sites: usize,
    pub pages: usize,
    pub lemmas: usize,
    pub indexing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedStatistics {
    pub url: String,
    pub name: String,
    pub status: String,
    /// Milliseconds since the epoch
    pub status_time: i64,
    pub error: Option<String>,
    pub pages: usize,
    pub lemmas: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    pub total: TotalStatistics,
    pub detailed: Vec<DetailedStatistics>,
}

/// A page to index: already fetched by the crawl, or only discovered
enum Work {
    Fetched(FetchedPage),
    Discovered(String),
}

impl Work {
    fn url(&self) -> &str {
        match self {
            Work::Fetched(page) => &page.url,
            Work::Discovered(url) => url,
        }
    }
}

/// Registration of an active run; dropping it frees the site slot
struct ActiveRun {
    site_id: i64,
    session: Arc<CrawlSession>,
    sessions: Arc<DashMap<i64, Arc<CrawlSession>>>,
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.sessions.remove(&self.site_id);
    }
}

/// Indexing control surface
#[derive(Clone)]
pub struct IndexingService {
    engine: Arc<IndexingEngine>,
    crawler: Arc<Crawler>,
    history: Arc<HistorySink>,
    notifications: Arc<Notifications>,
    sessions: Arc<DashMap<i64, Arc<CrawlSession>>>,
    persist_history: bool,
    workers: usize,
    show_progress: bool,
}

impl IndexingService {
    /// Wire the engine, crawler and history sink from configuration.
    ///
    /// Region weights come from the field table, or from `[fields]` when
    /// the table is empty.
    pub async fn from_config(config: &Config, store: Store) -> Result<Self> {
        let fields = store.list_fields().await?;
        let weights = if fields.is_empty() {
            FieldWeights {
                title: config.fields.title_weight,
                body: config.fields.body_weight,
            }
        } else {
            FieldWeights::from_fields(&fields)
        };

        let lemmatizer = Lemmatizer::from_config(&config.lemma)?;
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(&config.crawl)?);

        let engine = IndexingEngine::new(
            store.clone(),
            fetcher.clone(),
            ContentProcessor::new(lemmatizer, weights),
            RetryPolicy::from_config(&config.crawl),
            config.index.clone(),
        );
        let crawler = Crawler::with_fetcher(fetcher, config.crawl.clone());

        Ok(Self::new(
            engine,
            crawler,
            HistorySink::new(store),
            config.history.persist,
        ))
    }

    pub fn new(
        engine: IndexingEngine,
        crawler: Crawler,
        history: HistorySink,
        persist_history: bool,
    ) -> Self {
        let workers = crawler.config().effective_concurrency();
        Self {
            engine: Arc::new(engine),
            crawler: Arc::new(crawler),
            history: Arc::new(history),
            notifications: Arc::new(Notifications::new()),
            sessions: Arc::new(DashMap::new()),
            persist_history,
            workers,
            show_progress: false,
        }
    }

    /// Draw a progress bar per run
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn engine(&self) -> &IndexingEngine {
        &self.engine
    }

    pub fn store(&self) -> &Store {
        self.engine.store()
    }

    pub fn history(&self) -> &HistorySink {
        &self.history
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    /// Words the last indexing runs could not lemmatize, most frequent first.
    /// The list restarts whenever a run begins with no other run active.
    pub fn difficult_words(&self) -> Vec<(String, u64)> {
        self.engine.processor().lemmatizer().difficult_words()
    }

    /// Register every configured site that is not yet known
    pub async fn register_sites(&self, sites: &[SiteEntry]) -> Result<Vec<Site>> {
        let mut registered = Vec::with_capacity(sites.len());
        for entry in sites {
            registered.push(self.store().register_site(&entry.url, &entry.name).await?);
        }
        Ok(registered)
    }

    /// Whether any site is being indexed
    pub fn is_indexing(&self) -> bool {
        !self.sessions.is_empty()
    }

    pub fn is_site_indexing(&self, site_id: i64) -> bool {
        self.sessions.contains_key(&site_id)
    }

    /// Start a background run for one site
    pub async fn start_indexing(&self, site_id: i64) -> Result<JoinHandle<Result<IndexingReport>>> {
        let (site, run) = self.claim(site_id).await?;
        let service = self.clone();
        Ok(tokio::spawn(async move { service.execute(site, run).await }))
    }

    /// Run one site to completion
    pub async fn run_indexing(&self, site_id: i64) -> Result<IndexingReport> {
        let (site, run) = self.claim(site_id).await?;
        self.execute(site, run).await
    }

    /// Run every registered site concurrently, one session each
    pub async fn start_all(&self) -> Result<Vec<IndexingReport>> {
        let sites = self.store().list_sites().await?;
        if sites.is_empty() {
            return Err(Error::Validation("No sites registered".to_string()));
        }

        let runs = sites.iter().map(|site| self.run_indexing(site.id));
        let mut reports = Vec::with_capacity(sites.len());
        for (site, result) in sites.iter().zip(futures::future::join_all(runs).await) {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => warn!("Skipped {}: {}", site.url, e),
            }
        }
        Ok(reports)
    }

    /// Cancel the active run of one site
    pub fn stop_indexing(&self, site_id: i64) -> Result<()> {
        let session = self
            .sessions
            .get(&site_id)
            .map(|s| s.value().clone())
            .ok_or_else(|| Error::State("Indexing is not running".to_string()))?;
        info!("Stopping indexing of {}", session.seed());
        session.cancel();
        Ok(())
    }

    /// Cancel every active run; returns how many were signalled
    pub fn stop_all(&self) -> usize {
        let mut stopped = 0;
        for entry in self.sessions.iter() {
            entry.value().cancel();
            stopped += 1;
        }
        if stopped > 0 {
            info!("Stopping {} indexing runs", stopped);
        }
        stopped
    }

    /// Index one page outside of a full run
    pub async fn index_single_page(&self, url: &str) -> Result<Page> {
        let session_id = self.history.start_session();
        let result = self.engine.index_page(url).await;

        let status = if result.is_ok() {
            SiteStatus::Saved
        } else {
            SiteStatus::Failed
        };
        self.history.append(session_id, url, status)?;
        self.history
            .complete(session_id, self.persist_history)
            .await?;
        result
    }

    /// Delete one indexed page by URL
    pub async fn remove_page(&self, url: &str) -> Result<()> {
        let record = self
            .engine
            .remove_page_by_url(url, Uuid::new_v4())
            .await?;
        info!("Removed {} ({})", record.url, record.status);
        Ok(())
    }

    /// Delete a site with everything it owns
    pub async fn remove_site(&self, site_id: i64) -> Result<()> {
        if self.is_site_indexing(site_id) {
            return Err(Error::State(
                "Site is being indexed; stop it first".to_string(),
            ));
        }
        self.store().remove_site(site_id).await
    }

    pub async fn statistics(&self) -> Result<Statistics> {
        let store = self.store();
        let counts = store.global_counts().await?;

        let mut detailed = Vec::new();
        for site in store.list_sites().await? {
            let site_counts = store.site_counts(site.id).await?;
            detailed.push(DetailedStatistics {
                status_time: site.status_time_millis(),
                url: site.url,
                name: site.name,
                status: site.status,
                error: site.last_error,
                pages: site_counts.pages,
                lemmas: site_counts.lemmas,
            });
        }

        Ok(Statistics {
            total: TotalStatistics {
                sites: counts.sites,
                pages: counts.pages,
                lemmas: counts.lemmas,
                indexing: self.is_indexing(),
            },
            detailed,
        })
    }

    // ===== Run internals =====

    async fn claim(&self, site_id: i64) -> Result<(Site, ActiveRun)> {
        let site = self
            .store()
            .get_site(site_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Site {} not found", site_id)))?;

        let session = Arc::new(CrawlSession::new(site.url.clone()));
        match self.sessions.entry(site_id) {
            Entry::Occupied(_) => {
                return Err(Error::State(format!(
                    "Indexing of {} is already running",
                    site.url
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
            }
        }
        if self.sessions.len() == 1 {
            self.engine.processor().lemmatizer().clear_difficult();
        }

        let run = ActiveRun {
            site_id,
            session,
            sessions: self.sessions.clone(),
        };
        Ok((site, run))
    }

    async fn execute(&self, site: Site, run: ActiveRun) -> Result<IndexingReport> {
        let session = run.session.clone();
        let history_id = self.history.start_session();
        let mut report = IndexingReport {
            site_id: site.id,
            site_url: site.url.clone(),
            status: SiteStatus::Indexing,
            session_id: history_id,
            pages_indexed: 0,
            pages_failed: 0,
            links_discovered: 0,
            timed_out: false,
            error: None,
        };

        let outcome = self.index_site(&site, &session, history_id, &mut report).await;
        if let Err(e) = outcome {
            error!("Indexing of {} failed: {}", site.url, e);
            report.status = SiteStatus::Failed;
            report.error = Some(e.to_string());
        } else if session.is_stopped() {
            report.status = SiteStatus::Stopped;
            report.error = Some(STOPPED_BY_USER.to_string());
        } else {
            report.status = SiteStatus::Indexed;
        }

        // The session is closed and announced even when the final status
        // cannot be written; that error is returned afterwards.
        let status_written = self
            .store()
            .update_site_status(site.id, report.status, report.error.as_deref())
            .await;
        if let Err(e) = &status_written {
            error!("Could not record final status of {}: {}", site.url, e);
        }
        let history_written = match self.history.append(history_id, &site.url, report.status) {
            Ok(_) => self
                .history
                .complete(history_id, self.persist_history)
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        };

        self.notifications.notify(match report.status {
            SiteStatus::Indexed => format!(
                "Indexing of {} completed: {} pages indexed, {} failed",
                site.url, report.pages_indexed, report.pages_failed
            ),
            SiteStatus::Stopped => format!(
                "Indexing of {} stopped after {} pages",
                site.url, report.pages_indexed
            ),
            _ => format!(
                "Indexing of {} failed: {}",
                site.url,
                report.error.as_deref().unwrap_or("unknown error")
            ),
        });

        drop(run);
        status_written?;
        history_written?;
        Ok(report)
    }

    async fn index_site(
        &self,
        site: &Site,
        session: &Arc<CrawlSession>,
        history_id: Uuid,
        report: &mut IndexingReport,
    ) -> Result<()> {
        let store = self.store();
        store
            .update_site_status(site.id, SiteStatus::Indexing, None)
            .await?;

        // Previous data survives a failed seed; it is dropped only once the
        // crawl has something to replace it with.
        let outcome = self.crawler.crawl(session).await?;
        let cleared = store.clear_site_data(site.id).await?;
        if cleared > 0 {
            info!("Cleared {} pages of {} before reindexing", cleared, site.url);
        }
        report.links_discovered = outcome.discovered.len();
        report.timed_out = outcome.timed_out;
        if outcome.state == CrawlState::Stopped {
            info!("Crawl of {} stopped; indexing collected pages", site.url);
        }

        let mut seen = HashSet::new();
        let mut work = Vec::new();
        for page in outcome.pages {
            if seen.insert(page.url.clone()) {
                work.push(Work::Fetched(page));
            }
        }
        for url in outcome.discovered {
            if seen.insert(url.clone()) {
                work.push(Work::Discovered(url));
            }
        }

        let pb = if self.show_progress {
            start_progress(work.len(), &site.url)
        } else {
            None
        };

        let results: Vec<(String, Result<Page>)> = stream::iter(work)
            .map(|item| async move {
                let url = item.url().to_string();
                let result = self.index_work(site, session, item).await;
                (url, result)
            })
            .buffer_unordered(self.workers.max(1))
            .collect()
            .await;

        for (url, result) in results {
            advance_progress(&pb);
            match result {
                Ok(_) => {
                    report.pages_indexed += 1;
                    self.history.append(history_id, &url, SiteStatus::Indexed)?;
                }
                Err(Error::State(_)) => {}
                Err(e) => {
                    warn!("Skipping {}: {}", url, e);
                    report.pages_failed += 1;
                    self.history.append(history_id, &url, SiteStatus::Failed)?;
                }
            }
        }
        finish_progress(pb, "done");

        info!(
            "Indexed {} pages of {} ({} failed)",
            report.pages_indexed, site.url, report.pages_failed
        );
        Ok(())
    }

    /// Fetched content is always indexed; anything needing a new fetch is
    /// skipped once the run is stopped.
    async fn index_work(&self, site: &Site, session: &CrawlSession, item: Work) -> Result<Page> {
        match item {
            Work::Fetched(page) if !page.is_blank() => {
                self.engine
                    .index_content(site, &page.url, page.status, &page.body)
                    .await
            }
            _ if session.is_stopped() => Err(Error::State(STOPPED_BY_USER.to_string())),
            Work::Fetched(page) => self.engine.fetch_and_index(site, &page.url).await,
            Work::Discovered(url) => self.engine.fetch_and_index(site, &url).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(
            format!("<html><head><title>Page</title></head><body>{}</body></html>", body)
                .into_bytes(),
            "text/html",
        )
    }

    async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(server)
            .await;
    }

    async fn setup_service(server: &MockServer) -> (IndexingService, Site, TempDir) {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        config.crawl.requests_per_second = 0;
        config.crawl.retry_backoff_ms = 1;
        config.crawl.shutdown_grace_secs = 1;

        let store = Store::connect(&config).await.unwrap();
        let service = IndexingService::from_config(&config, store).await.unwrap();
        let site = service
            .store()
            .register_site(&server.uri(), "Mock")
            .await
            .unwrap();
        (service, site, tmp)
    }

    #[tokio::test]
    async fn test_stop_without_run_is_rejected() {
        let server = MockServer::start().await;
        let (service, site, _tmp) = setup_service(&server).await;

        let err = service.stop_indexing(site.id).unwrap_err();
        assert!(matches!(err, Error::State(_)));
        assert_eq!(service.stop_all(), 0);
        assert!(!service.is_indexing());
    }

    #[tokio::test]
    async fn test_full_run_indexes_site() {
        let server = MockServer::start().await;
        mount(&server, "/", html("город <a href=\"/a\">a</a> <a href=\"/b\">b</a>")).await;
        mount(&server, "/a", html("лес и город")).await;
        mount(&server, "/b", html("страница <a href=\"/missing\">x</a>")).await;
        mount(&server, "/missing", ResponseTemplate::new(404)).await;

        let (service, site, _tmp) = setup_service(&server).await;
        let report = service.run_indexing(site.id).await.unwrap();

        assert_eq!(report.status, SiteStatus::Indexed);
        assert_eq!(report.pages_indexed, 3);
        assert_eq!(report.pages_failed, 1);
        assert!(report.error.is_none());
        assert!(!service.is_indexing());

        let store = service.store();
        let stored = store.get_site(site.id).await.unwrap().unwrap();
        assert_eq!(stored.get_status().unwrap(), SiteStatus::Indexed);
        let city = &store.find_lemmas("город", Some(site.id)).await.unwrap()[0];
        assert_eq!(city.frequency, 2);

        let history = store.list_history(100).await.unwrap();
        assert!(history.iter().any(|r| r.status == "FAILED" && r.url.ends_with("/missing")));
        assert_eq!(service.history().open_sessions(), 0);
        assert_eq!(service.notifications().list().len(), 1);

        let stats = service.statistics().await.unwrap();
        assert_eq!(stats.total.sites, 1);
        assert_eq!(stats.total.pages, 3);
        assert_eq!(stats.detailed[0].status, "INDEXED");
        assert_eq!(stats.detailed[0].pages, 3);
    }

    #[tokio::test]
    async fn test_reindex_starts_from_scratch() {
        let server = MockServer::start().await;
        mount(&server, "/", html("город <a href=\"/a\">a</a>")).await;
        mount(&server, "/a", html("город")).await;

        let (service, site, _tmp) = setup_service(&server).await;
        service.run_indexing(site.id).await.unwrap();
        service.run_indexing(site.id).await.unwrap();

        let city = &service
            .store()
            .find_lemmas("город", Some(site.id))
            .await
            .unwrap()[0];
        assert_eq!(city.frequency, 2);
        assert_eq!(service.store().count_pages(Some(site.id)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_seed_failure_marks_site_failed() {
        let server = MockServer::start().await;
        mount(&server, "/", ResponseTemplate::new(503)).await;

        let (service, site, _tmp) = setup_service(&server).await;
        let report = service.run_indexing(site.id).await.unwrap();

        assert_eq!(report.status, SiteStatus::Failed);
        assert!(report.error.is_some());
        let stored = service.store().get_site(site.id).await.unwrap().unwrap();
        assert_eq!(stored.status, "FAILED");
        assert!(stored.last_error.is_some());
        assert_eq!(service.store().count_pages(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_reindex_keeps_previous_data() {
        let server = MockServer::start().await;
        mount(&server, "/", html("город <a href=\"/a\">a</a>")).await;
        mount(&server, "/a", html("лес")).await;

        let (service, site, _tmp) = setup_service(&server).await;
        service.run_indexing(site.id).await.unwrap();
        assert_eq!(service.store().count_pages(Some(site.id)).await.unwrap(), 2);

        server.reset().await;
        mount(&server, "/", ResponseTemplate::new(503)).await;
        let report = service.run_indexing(site.id).await.unwrap();

        assert_eq!(report.status, SiteStatus::Failed);
        assert_eq!(service.store().count_pages(Some(site.id)).await.unwrap(), 2);
        assert_eq!(
            service.store().find_lemmas("лес", Some(site.id)).await.unwrap().len(),
            1
        );
        let stored = service.store().get_site(site.id).await.unwrap().unwrap();
        assert_eq!(stored.status, "FAILED");
    }

    #[tokio::test]
    async fn test_lost_status_write_still_closes_session() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/",
            html("город").set_delay(Duration::from_millis(300)),
        )
        .await;

        let (service, site, _tmp) = setup_service(&server).await;
        let handle = service.start_indexing(site.id).await.unwrap();
        service.store().remove_site(site.id).await.unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(service.history().open_sessions(), 0);
        assert_eq!(service.notifications().list().len(), 1);
        assert!(!service.is_indexing());
    }

    #[tokio::test]
    async fn test_difficult_words_reset_per_run() {
        let server = MockServer::start().await;
        mount(&server, "/", html("catкот город catкот")).await;

        let (service, site, _tmp) = setup_service(&server).await;
        service.run_indexing(site.id).await.unwrap();
        assert_eq!(service.difficult_words(), vec![("catкот".to_string(), 2)]);

        service.run_indexing(site.id).await.unwrap();
        assert_eq!(service.difficult_words(), vec![("catкот".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_second_run_rejected_and_stop() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/",
            html("город <a href=\"/a\">a</a>").set_delay(Duration::from_millis(300)),
        )
        .await;
        mount(&server, "/a", html("лес")).await;

        let (service, site, _tmp) = setup_service(&server).await;
        let handle = service.start_indexing(site.id).await.unwrap();
        assert!(service.is_site_indexing(site.id));

        let err = service.run_indexing(site.id).await.unwrap_err();
        assert!(matches!(err, Error::State(_)));
        let err = service.remove_site(site.id).await.unwrap_err();
        assert!(matches!(err, Error::State(_)));

        service.stop_indexing(site.id).unwrap();
        let report = handle.await.unwrap().unwrap();

        assert_eq!(report.status, SiteStatus::Stopped);
        assert_eq!(report.error.as_deref(), Some(STOPPED_BY_USER));
        assert_eq!(report.pages_indexed, 1);
        assert!(!service.is_indexing());

        let stored = service.store().get_site(site.id).await.unwrap().unwrap();
        assert_eq!(stored.status, "STOPPED");
        assert_eq!(stored.last_error.as_deref(), Some(STOPPED_BY_USER));
    }

    #[tokio::test]
    async fn test_index_single_page_records_history() {
        let server = MockServer::start().await;
        mount(&server, "/p", html("город")).await;

        let (service, _site, _tmp) = setup_service(&server).await;
        let url = format!("{}/p", server.uri());
        service.index_single_page(&url).await.unwrap();
        assert!(service
            .index_single_page(&format!("{}/gone", server.uri()))
            .await
            .is_err());

        let history = service.store().list_history(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().any(|r| r.url == url && r.status == "SAVED"));
        assert!(history.iter().any(|r| r.status == "FAILED"));
    }
}
