//! Index storage using SQLite
//!
//! This module handles all persistent state:
//! - Sites (registered crawl roots and their lifecycle status)
//! - Pages (fetched documents)
//! - Lemmas and indices (the inverted index)
//! - Fields (scoring weights)
//! - Indexing history (flushed session records)
//!
//! Site and page rows are served through an explicit [`EntityCache`].

mod cache;
mod schema;

pub use cache::*;
pub use schema::*;

use crate::config::{Config, SiteMatch};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

/// SQLite result codes for a locked database (BUSY, LOCKED, BUSY_RECOVERY)
const BUSY_CODES: [&str; 3] = ["5", "6", "517"];

/// Site lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiteStatus {
    Pending,
    Indexing,
    Indexed,
    Failed,
    Stopped,
    ServerError,
    NotFound,
    Deleted,
    Saved,
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SiteStatus::Pending => "PENDING",
            SiteStatus::Indexing => "INDEXING",
            SiteStatus::Indexed => "INDEXED",
            SiteStatus::Failed => "FAILED",
            SiteStatus::Stopped => "STOPPED",
            SiteStatus::ServerError => "SERVER_ERROR",
            SiteStatus::NotFound => "NOT_FOUND",
            SiteStatus::Deleted => "DELETED",
            SiteStatus::Saved => "SAVED",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for SiteStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(SiteStatus::Pending),
            "INDEXING" => Ok(SiteStatus::Indexing),
            "INDEXED" => Ok(SiteStatus::Indexed),
            "FAILED" => Ok(SiteStatus::Failed),
            "STOPPED" => Ok(SiteStatus::Stopped),
            "SERVER_ERROR" => Ok(SiteStatus::ServerError),
            "NOT_FOUND" => Ok(SiteStatus::NotFound),
            "DELETED" => Ok(SiteStatus::Deleted),
            "SAVED" => Ok(SiteStatus::Saved),
            _ => Err(Error::Parse(format!("Unknown site status: {}", s))),
        }
    }
}

/// A registered site
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub status: String,
    pub status_time: String,
    pub last_error: Option<String>,
}

impl Site {
    pub fn get_status(&self) -> Result<SiteStatus> {
        self.status.parse()
    }

    /// Lowercased host of the site URL
    pub fn host(&self) -> Option<String> {
        host_of(&self.url)
    }

    /// `status_time` as milliseconds since the epoch
    pub fn status_time_millis(&self) -> i64 {
        DateTime::parse_from_rfc3339(&self.status_time)
            .map(|t| t.timestamp_millis())
            .unwrap_or(0)
    }
}

/// A fetched page
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Page {
    pub id: i64,
    pub site_id: i64,
    pub url: String,
    pub path: String,
    pub code: i64,
    pub content: String,
    pub content_hash: String,
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub relevance: f64,
    pub status: String,
    pub available: bool,
}

/// Page data ready to be written; never partial
#[derive(Debug, Clone)]
pub struct NewPage {
    pub site_id: i64,
    pub url: String,
    pub code: u16,
    pub content: String,
    pub title: Option<String>,
}

impl NewPage {
    pub fn new(site_id: i64, url: impl Into<String>, code: u16, content: impl Into<String>) -> Self {
        Self {
            site_id,
            url: url.into(),
            code,
            content: content.into(),
            title: None,
        }
    }

    /// Path component of the URL, `/` when absent
    pub fn path(&self) -> String {
        Url::parse(&self.url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| "/".to_string())
    }

    pub fn content_hash(&self) -> String {
        blake3::hash(self.content.as_bytes()).to_hex().to_string()
    }
}

/// A base form seen on a site
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Lemma {
    pub id: i64,
    pub lemma: String,
    pub site_id: i64,
    /// Number of distinct pages containing the lemma
    pub frequency: i64,
    pub status: String,
}

/// A lemma posting for one page
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: i64,
    pub page_id: i64,
    pub lemma_id: i64,
    pub rank: f64,
}

/// Scoring weight for a page region
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Field {
    pub id: i64,
    pub name: String,
    pub selector: String,
    pub weight: f64,
}

impl Field {
    pub fn new(name: impl Into<String>, selector: impl Into<String>, weight: f64) -> Self {
        Self {
            id: 0,
            name: name.into(),
            selector: selector.into(),
            weight,
        }
    }
}

/// One indexing event
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub session_id: String,
    pub url: String,
    pub timestamp: String,
    pub status: String,
}

impl HistoryRecord {
    pub fn new(session_id: Uuid, url: impl Into<String>, status: SiteStatus) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            url: url.into(),
            timestamp: Utc::now().to_rfc3339(),
            status: status.to_string(),
        }
    }
}

/// Page and lemma totals for one site
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SiteCounts {
    pub pages: usize,
    pub lemmas: usize,
}

/// Row counts across the whole store
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GlobalCounts {
    pub sites: usize,
    pub pages: usize,
    pub lemmas: usize,
}

/// Lowercased host of a URL
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

/// Map lock contention to a retryable conflict, everything else to a storage error
fn write_error(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &err {
        if db.code().is_some_and(|code| BUSY_CODES.contains(&code.as_ref())) {
            return Error::Conflict(db.message().to_string());
        }
    }
    Error::Database(err)
}

/// Index database handle
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    sites: EntityCache<Site>,
    pages: EntityCache<Page>,
}

impl Store {
    /// Open the database named in the config
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::open(&config.paths.db_file).await
    }

    /// Open (creating if needed) a database file and apply the schema
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            sites: EntityCache::new(),
            pages: EntityCache::new(),
        };

        if !store.is_initialized().await? {
            store.init_schema().await?;
        }

        Ok(store)
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type='table' AND name='sites'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(result.is_some())
    }

    // ===== Site Operations =====

    /// Insert a site as PENDING, or rename it if the URL is already registered
    pub async fn register_site(&self, url: &str, name: &str) -> Result<Site> {
        if !crate::crawl::is_valid(url) {
            return Err(Error::Validation(format!("Invalid site URL: {}", url)));
        }
        if name.trim().is_empty() {
            return Err(Error::Validation("Site name must not be blank".to_string()));
        }

        let site = sqlx::query_as::<_, Site>(
            r#"
            INSERT INTO sites (url, name, status, status_time, last_error)
            VALUES (?, ?, ?, ?, NULL)
            ON CONFLICT(url) DO UPDATE SET name = excluded.name
            RETURNING *
            "#,
        )
        .bind(url)
        .bind(name.trim())
        .bind(SiteStatus::Pending.to_string())
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;

        self.sites.put(site.id, site.clone());
        Ok(site)
    }

    /// Get site by ID
    pub async fn get_site(&self, id: i64) -> Result<Option<Site>> {
        if let Some(site) = self.sites.get(id) {
            return Ok(Some(site));
        }
        let site = sqlx::query_as::<_, Site>("SELECT * FROM sites WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(ref site) = site {
            self.sites.put(site.id, site.clone());
        }
        Ok(site)
    }

    /// Get site by its exact URL
    pub async fn find_site_by_url(&self, url: &str) -> Result<Option<Site>> {
        let site = sqlx::query_as::<_, Site>("SELECT * FROM sites WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(site)
    }

    /// List all sites, oldest first
    pub async fn list_sites(&self) -> Result<Vec<Site>> {
        let sites = sqlx::query_as::<_, Site>("SELECT * FROM sites ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(sites)
    }

    /// Find the site owning a page URL.
    ///
    /// Exact matching requires the page host to equal the site host; the
    /// oldest such site wins. Partial matching falls back to the oldest site
    /// whose URL contains the page host.
    pub async fn resolve_site(&self, page_url: &str, strategy: SiteMatch) -> Result<Option<Site>> {
        let Some(host) = host_of(page_url) else {
            return Ok(None);
        };
        let sites = self.list_sites().await?;

        if let Some(site) = sites
            .iter()
            .find(|s| s.host().as_deref() == Some(host.as_str()))
        {
            return Ok(Some(site.clone()));
        }

        match strategy {
            SiteMatch::Exact => Ok(None),
            SiteMatch::Partial => Ok(sites
                .into_iter()
                .find(|s| s.url.to_ascii_lowercase().contains(&host))),
        }
    }

    /// Set status, refresh `status_time` and replace `last_error`
    pub async fn update_site_status(
        &self,
        id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE sites SET status = ?, status_time = ?, last_error = ? WHERE id = ?",
        )
        .bind(status.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(last_error)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        self.sites.invalidate(id);
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Site {} not found", id)));
        }
        Ok(())
    }

    /// Refresh `status_time` after a page was added
    pub async fn touch_site(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE sites SET status_time = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(write_error)?;
        self.sites.invalidate(id);
        Ok(())
    }

    /// Delete every page, index row and lemma of a site, keeping the site
    pub async fn clear_site_data(&self, site_id: i64) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM indices WHERE page_id IN (SELECT id FROM pages WHERE site_id = ?)",
        )
        .bind(site_id)
        .execute(&mut *tx)
        .await
        .map_err(write_error)?;

        let pages = sqlx::query("DELETE FROM pages WHERE site_id = ?")
            .bind(site_id)
            .execute(&mut *tx)
            .await
            .map_err(write_error)?;

        sqlx::query("DELETE FROM lemmas WHERE site_id = ?")
            .bind(site_id)
            .execute(&mut *tx)
            .await
            .map_err(write_error)?;

        tx.commit().await?;

        self.pages.invalidate_where(|page| page.site_id == site_id);
        Ok(pages.rows_affected())
    }

    /// Delete a site and everything it owns
    pub async fn remove_site(&self, site_id: i64) -> Result<()> {
        self.clear_site_data(site_id).await?;

        let result = sqlx::query("DELETE FROM sites WHERE id = ?")
            .bind(site_id)
            .execute(&self.pool)
            .await
            .map_err(write_error)?;

        self.sites.invalidate(site_id);
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Site {} not found", site_id)));
        }
        Ok(())
    }

    // ===== Page Operations =====

    /// Insert a page, or overwrite the stored one with the same URL
    pub async fn upsert_page(&self, page: &NewPage) -> Result<Page> {
        let stored = sqlx::query_as::<_, Page>(
            r#"
            INSERT INTO pages (site_id, url, path, code, content, content_hash, title, status, available)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)
            ON CONFLICT(url) DO UPDATE SET
                site_id = excluded.site_id,
                path = excluded.path,
                code = excluded.code,
                content = excluded.content,
                content_hash = excluded.content_hash,
                title = excluded.title,
                status = excluded.status,
                available = 1
            RETURNING *
            "#,
        )
        .bind(page.site_id)
        .bind(&page.url)
        .bind(page.path())
        .bind(i64::from(page.code))
        .bind(&page.content)
        .bind(page.content_hash())
        .bind(&page.title)
        .bind(SiteStatus::Indexed.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;

        self.pages.put(stored.id, stored.clone());
        Ok(stored)
    }

    /// Get page by ID
    pub async fn get_page(&self, id: i64) -> Result<Option<Page>> {
        if let Some(page) = self.pages.get(id) {
            return Ok(Some(page));
        }
        let page = sqlx::query_as::<_, Page>("SELECT * FROM pages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(ref page) = page {
            self.pages.put(page.id, page.clone());
        }
        Ok(page)
    }

    /// Get page by its exact URL
    pub async fn get_page_by_url(&self, url: &str) -> Result<Option<Page>> {
        let page = sqlx::query_as::<_, Page>("SELECT * FROM pages WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(page)
    }

    /// Stored pages in insertion order, optionally for one site
    pub async fn list_pages(&self, site_id: Option<i64>) -> Result<Vec<Page>> {
        let pages = match site_id {
            Some(id) => {
                sqlx::query_as::<_, Page>("SELECT * FROM pages WHERE site_id = ? ORDER BY id")
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as::<_, Page>("SELECT * FROM pages ORDER BY id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(pages)
    }

    /// Count pages, optionally for one site
    pub async fn count_pages(&self, site_id: Option<i64>) -> Result<usize> {
        let count: i64 = match site_id {
            Some(id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM pages WHERE site_id = ?")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM pages")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count as usize)
    }

    /// Remove a page and its postings, recording the deletion in history.
    ///
    /// All three writes commit together. Lemma rows are left untouched.
    pub async fn delete_by_page(&self, page_id: i64, session_id: Uuid) -> Result<HistoryRecord> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM indices WHERE page_id = ?")
            .bind(page_id)
            .execute(&mut *tx)
            .await
            .map_err(write_error)?;

        let url: Option<String> = sqlx::query_scalar("DELETE FROM pages WHERE id = ? RETURNING url")
            .bind(page_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(write_error)?;

        let Some(url) = url else {
            tx.rollback().await?;
            return Err(Error::NotFound(format!("Page {} not found", page_id)));
        };

        let record = HistoryRecord::new(session_id, url, SiteStatus::Deleted);
        insert_history(&mut tx, &record).await?;

        tx.commit().await?;

        self.pages.invalidate(page_id);
        debug!("Deleted page {} ({})", page_id, record.url);
        Ok(record)
    }

    // ===== Lemma Operations =====

    /// Insert a lemma with frequency 1, or add one to the existing row
    pub async fn upsert_lemma(&self, lemma: &str, site_id: i64) -> Result<Lemma> {
        if lemma.trim().is_empty() {
            return Err(Error::Validation("Lemma must not be blank".to_string()));
        }

        let row = sqlx::query_as::<_, Lemma>(
            r#"
            INSERT INTO lemmas (lemma, site_id, frequency, status)
            VALUES (?, ?, 1, 'INDEXED')
            ON CONFLICT(lemma, site_id) DO UPDATE SET frequency = frequency + 1
            RETURNING *
            "#,
        )
        .bind(lemma)
        .bind(site_id)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(row)
    }

    /// Lemma rows with this text, across all sites or for one
    pub async fn find_lemmas(&self, lemma: &str, site_id: Option<i64>) -> Result<Vec<Lemma>> {
        let rows = match site_id {
            Some(id) => {
                sqlx::query_as::<_, Lemma>(
                    "SELECT * FROM lemmas WHERE lemma = ? AND site_id = ? ORDER BY id",
                )
                .bind(lemma)
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Lemma>("SELECT * FROM lemmas WHERE lemma = ? ORDER BY id")
                    .bind(lemma)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }

    /// Count lemmas, optionally for one site
    pub async fn count_lemmas(&self, site_id: Option<i64>) -> Result<usize> {
        let count: i64 = match site_id {
            Some(id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM lemmas WHERE site_id = ?")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM lemmas")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count as usize)
    }

    // ===== Index Operations =====

    /// Insert a posting, or add `rank` to the existing one
    pub async fn upsert_index(&self, page_id: i64, lemma_id: i64, rank: f64) -> Result<IndexEntry> {
        let row = sqlx::query_as::<_, IndexEntry>(
            r#"
            INSERT INTO indices (page_id, lemma_id, rank)
            VALUES (?, ?, ?)
            ON CONFLICT(page_id, lemma_id) DO UPDATE SET rank = rank + excluded.rank
            RETURNING *
            "#,
        )
        .bind(page_id)
        .bind(lemma_id)
        .bind(rank)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(row)
    }

    /// Postings of one lemma, in insertion order
    pub async fn indices_for_lemma(&self, lemma_id: i64) -> Result<Vec<IndexEntry>> {
        let rows = sqlx::query_as::<_, IndexEntry>(
            "SELECT * FROM indices WHERE lemma_id = ? ORDER BY id",
        )
        .bind(lemma_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Pages that carry a posting for `lemma_id`
    pub async fn page_ids_for_lemma(&self, lemma_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT page_id FROM indices WHERE lemma_id = ?")
            .bind(lemma_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    /// Posting for one (page, lemma) pair
    pub async fn get_index(&self, page_id: i64, lemma_id: i64) -> Result<Option<IndexEntry>> {
        let row = sqlx::query_as::<_, IndexEntry>(
            "SELECT * FROM indices WHERE page_id = ? AND lemma_id = ?",
        )
        .bind(page_id)
        .bind(lemma_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Postings of one page
    pub async fn indices_for_page(&self, page_id: i64) -> Result<Vec<IndexEntry>> {
        let rows = sqlx::query_as::<_, IndexEntry>(
            "SELECT * FROM indices WHERE page_id = ? ORDER BY id",
        )
        .bind(page_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ===== Field Operations =====

    /// Insert or overwrite fields by name
    pub async fn seed_fields(&self, fields: &[Field]) -> Result<()> {
        for field in fields {
            if field.weight < 0.0 {
                return Err(Error::Validation(format!(
                    "Field '{}' has a negative weight",
                    field.name
                )));
            }
            sqlx::query(
                r#"
                INSERT INTO fields (name, selector, weight)
                VALUES (?, ?, ?)
                ON CONFLICT(name) DO UPDATE SET
                    selector = excluded.selector,
                    weight = excluded.weight
                "#,
            )
            .bind(&field.name)
            .bind(&field.selector)
            .bind(field.weight)
            .execute(&self.pool)
            .await
            .map_err(write_error)?;
        }
        Ok(())
    }

    pub async fn list_fields(&self) -> Result<Vec<Field>> {
        let fields = sqlx::query_as::<_, Field>("SELECT * FROM fields ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(fields)
    }

    // ===== History Operations =====

    /// Append history records in one transaction
    pub async fn insert_history(&self, records: &[HistoryRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            insert_history(&mut tx, record).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Most recent history records first
    pub async fn list_history(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        let records = sqlx::query_as::<_, HistoryRecord>(
            "SELECT * FROM indexing_history ORDER BY timestamp DESC, rowid DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    // ===== Statistics =====

    pub async fn site_counts(&self, site_id: i64) -> Result<SiteCounts> {
        Ok(SiteCounts {
            pages: self.count_pages(Some(site_id)).await?,
            lemmas: self.count_lemmas(Some(site_id)).await?,
        })
    }

    pub async fn global_counts(&self) -> Result<GlobalCounts> {
        let sites: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sites")
            .fetch_one(&self.pool)
            .await?;

        Ok(GlobalCounts {
            sites: sites as usize,
            pages: self.count_pages(None).await?,
            lemmas: self.count_lemmas(None).await?,
        })
    }
}

async fn insert_history(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    record: &HistoryRecord,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO indexing_history (id, session_id, url, timestamp, status)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.session_id)
    .bind(&record.url)
    .bind(&record.timestamp)
    .bind(&record.status)
    .execute(&mut **tx)
    .await
    .map_err(write_error)?;
    Ok(())
}
