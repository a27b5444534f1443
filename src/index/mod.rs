//! Indexing engine
//!
//! Turns page content into persisted Page, Lemma and Index rows. Lemma and
//! index writes accumulate: a lemma's frequency grows by one per indexed
//! page and a posting's rank grows by each new weight. Both are single
//! conflict-aware upserts, so concurrent writers never lose an update.

mod service;

pub use service::*;

use crate::config::IndexConfig;
use crate::crawl::{fetch_with_retry, is_valid, PageFetcher, RetryPolicy};
use crate::error::{Error, Result};
use crate::parse::{extract_title, ContentProcessor};
use crate::store::{HistoryRecord, NewPage, Page, Site, Store};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Base delay between attempts of a conflicting upsert
const CONFLICT_BACKOFF: Duration = Duration::from_millis(20);

pub struct IndexingEngine {
    store: Store,
    fetcher: Arc<dyn PageFetcher>,
    processor: ContentProcessor,
    retry: RetryPolicy,
    config: IndexConfig,
}

impl IndexingEngine {
    pub fn new(
        store: Store,
        fetcher: Arc<dyn PageFetcher>,
        processor: ContentProcessor,
        retry: RetryPolicy,
        config: IndexConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            processor,
            retry,
            config,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn processor(&self) -> &ContentProcessor {
        &self.processor
    }

    /// Index one URL under the site that owns it.
    ///
    /// Nothing is written when the URL is malformed, no site matches, or
    /// the content stays blank after retries.
    pub async fn index_page(&self, url: &str) -> Result<Page> {
        if !is_valid(url) {
            return Err(Error::Validation(format!("Invalid page URL: {}", url)));
        }

        let site = self
            .store
            .resolve_site(url, self.config.site_match)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No registered site matches {}", url)))?;

        self.fetch_and_index(&site, url).await
    }

    /// Fetch with retries, then index under `site`
    pub async fn fetch_and_index(&self, site: &Site, url: &str) -> Result<Page> {
        let fetched = fetch_with_retry(self.fetcher.as_ref(), url, self.retry).await?;
        self.index_content(site, &fetched.url, fetched.status, &fetched.body)
            .await
    }

    /// Persist already-fetched content and its lemma weights
    pub async fn index_content(
        &self,
        site: &Site,
        url: &str,
        code: u16,
        content: &str,
    ) -> Result<Page> {
        if content.trim().is_empty() {
            return Err(Error::Validation(format!("Blank content at {}", url)));
        }

        let mut new_page = NewPage::new(site.id, url, code, content);
        let title = extract_title(content);
        if !title.is_empty() {
            new_page.title = Some(title);
        }

        let page = self.store.upsert_page(&new_page).await?;
        self.store.touch_site(site.id).await?;

        let weights = self.processor.page_weights(content);
        let lemmas = self.persist_weights(site.id, page.id, weights).await?;

        info!("Indexed {} ({} lemmas)", url, lemmas);
        Ok(page)
    }

    /// Upsert every (lemma, weight) pair of one page on a bounded worker pool.
    ///
    /// Returns the number of pairs written; the first failure is reported
    /// once every pair has been attempted.
    pub async fn persist_weights(
        &self,
        site_id: i64,
        page_id: i64,
        weights: HashMap<String, f64>,
    ) -> Result<usize> {
        let workers = self.config.upsert_workers.max(1);

        let results: Vec<Result<()>> = stream::iter(weights)
            .map(|(lemma, weight)| self.persist_pair(site_id, page_id, lemma, weight))
            .buffer_unordered(workers)
            .collect()
            .await;

        let total = results.len();
        let mut first_error = None;
        for result in results {
            if let Err(e) = result {
                warn!("Failed to persist lemma for page {}: {}", page_id, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(total),
        }
    }

    async fn persist_pair(&self, site_id: i64, page_id: i64, lemma: String, weight: f64) -> Result<()> {
        let attempts = self.config.conflict_retries.max(1);

        let row = with_conflict_retry(attempts, || self.store.upsert_lemma(&lemma, site_id)).await?;
        with_conflict_retry(attempts, || self.store.upsert_index(page_id, row.id, weight)).await?;
        Ok(())
    }

    /// Remove a page's postings and the page itself, recording the deletion
    pub async fn delete_by_page(&self, page_id: i64, session_id: Uuid) -> Result<HistoryRecord> {
        self.store.delete_by_page(page_id, session_id).await
    }

    /// [`Self::delete_by_page`] for the page stored under `url`
    pub async fn remove_page_by_url(&self, url: &str, session_id: Uuid) -> Result<HistoryRecord> {
        let page = self
            .store
            .get_page_by_url(url)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Page {} is not indexed", url)))?;
        self.delete_by_page(page.id, session_id).await
    }
}

/// Run `op` until it succeeds or fails with a non-retryable error
pub async fn with_conflict_retry<T, F, Fut>(attempts: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_retryable() && attempt < attempts => {
                debug!("Write conflict (attempt {}/{}): {}", attempt, attempts, e);
                tokio::time::sleep(CONFLICT_BACKOFF * attempt).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Alphabet;
    use crate::crawl::FetchedPage;
    use crate::lemma::Lemmatizer;
    use crate::morph::DictionaryMorphology;
    use crate::parse::FieldWeights;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    /// Serves fixed bodies keyed by URL
    struct StaticFetcher {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage> {
            let body = self
                .pages
                .get(url)
                .cloned()
                .ok_or_else(|| Error::Fetch(format!("HTTP 404: {}", url)))?;
            Ok(FetchedPage {
                url: url.to_string(),
                status: 200,
                body,
                content_type: Some("text/html".to_string()),
            })
        }
    }

    async fn setup_engine(pages: &[(&str, &str)]) -> (IndexingEngine, Site, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = Store::open(&tmp.path().join("test.db")).await.unwrap();
        let site = store
            .register_site("https://example.com", "Example")
            .await
            .unwrap();

        let fetcher = StaticFetcher {
            pages: pages
                .iter()
                .map(|(u, b)| (u.to_string(), b.to_string()))
                .collect(),
        };
        let lemmatizer = Lemmatizer::new(
            Arc::new(DictionaryMorphology::builtin()),
            Alphabet::Mixed,
            3,
        );
        let engine = IndexingEngine::new(
            store,
            Arc::new(fetcher),
            ContentProcessor::new(lemmatizer, FieldWeights::default()),
            RetryPolicy {
                attempts: 3,
                backoff: Duration::from_millis(1),
            },
            IndexConfig::default(),
        );
        (engine, site, tmp)
    }

    #[tokio::test]
    async fn test_index_page_writes_rows() {
        let (engine, site, _tmp) = setup_engine(&[(
            "https://example.com/cats",
            "<html><head><title>Коты</title></head><body>кот и собака</body></html>",
        )])
        .await;

        let page = engine.index_page("https://example.com/cats").await.unwrap();
        assert_eq!(page.path, "/cats");
        assert_eq!(page.title.as_deref(), Some("Коты"));

        let store = engine.store();
        let cat = &store.find_lemmas("кот", Some(site.id)).await.unwrap()[0];
        assert_eq!(cat.frequency, 1);
        let entry = store.get_index(page.id, cat.id).await.unwrap().unwrap();
        assert!((entry.rank - 1.8).abs() < 1e-9);
        assert!(store.find_lemmas("и", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_site_writes_nothing() {
        let (engine, _site, _tmp) = setup_engine(&[]).await;
        let err = engine.index_page("https://other.org/page").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(engine.store().count_pages(None).await.unwrap(), 0);

        let err = engine.index_page("ftp://example.com/x").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_blank_content_writes_nothing() {
        let (engine, _site, _tmp) = setup_engine(&[("https://example.com/blank", "  \n ")]).await;
        let err = engine.index_page("https://example.com/blank").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(engine.store().count_pages(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reindex_accumulates() {
        let (engine, site, _tmp) =
            setup_engine(&[("https://example.com/p", "<body>test test page</body>")]).await;

        let first = engine.index_page("https://example.com/p").await.unwrap();
        let second = engine.index_page("https://example.com/p").await.unwrap();
        assert_eq!(first.id, second.id);

        let store = engine.store();
        assert_eq!(store.count_pages(None).await.unwrap(), 1);
        let test = &store.find_lemmas("test", Some(site.id)).await.unwrap()[0];
        assert_eq!(test.frequency, 2);
        let entry = store.get_index(first.id, test.id).await.unwrap().unwrap();
        assert!((entry.rank - 3.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_remove_page_by_url() {
        let (engine, _site, _tmp) =
            setup_engine(&[("https://example.com/p", "<body>test page</body>")]).await;
        engine.index_page("https://example.com/p").await.unwrap();

        let session = Uuid::new_v4();
        let record = engine
            .remove_page_by_url("https://example.com/p", session)
            .await
            .unwrap();
        assert_eq!(record.session_id, session.to_string());

        let err = engine
            .remove_page_by_url("https://example.com/p", session)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_conflict_retry_recovers() {
        let calls = AtomicU32::new(0);
        let value = with_conflict_retry(5, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(Error::Conflict("database is locked".into()))
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_conflict_retry_gives_up() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_conflict_retry(2, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Conflict("database is locked".into()))
        })
        .await;
        assert!(matches!(result, Err(Error::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let result: Result<()> =
            with_conflict_retry(5, || async { Err(Error::NotFound("x".into())) }).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
