//! Indexing commands: full runs, single pages and removals

use crate::config::Config;
use crate::error::{Error, Result};
use crate::index::{IndexingReport, IndexingService};
use crate::store::{Page, Site, SiteStatus, Store};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Summary of one stored page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedPageInfo {
    pub site_id: i64,
    pub url: String,
    pub path: String,
    pub code: i64,
    pub title: Option<String>,
}

impl From<Page> for IndexedPageInfo {
    fn from(page: Page) -> Self {
        Self {
            site_id: page.site_id,
            url: page.url,
            path: page.path,
            code: page.code,
            title: page.title,
        }
    }
}

async fn service(config: &Config, store: Store, progress: bool) -> Result<IndexingService> {
    let service = IndexingService::from_config(config, store)
        .await?
        .with_progress(progress);
    service.register_sites(&config.sites).await?;
    Ok(service)
}

/// Look up a registered site, accepting the URL as written in the config
pub(crate) async fn find_site(config: &Config, store: &Store, url: &str) -> Result<Site> {
    let url = config.site(url).map(|s| s.url.as_str()).unwrap_or(url);
    store
        .find_site_by_url(url)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Site {} is not registered", url)))
}

/// Index every registered site, or only `site`.
///
/// Ctrl-C stops the active runs; pages already fetched are still indexed.
pub async fn cmd_index(
    config: &Config,
    store: Store,
    site: Option<&str>,
    progress: bool,
) -> Result<Vec<IndexingReport>> {
    let service = service(config, store, progress).await?;

    let stopper = service.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping indexing");
            stopper.stop_all();
        }
    });

    let result = match site {
        Some(url) => match find_site(config, service.store(), url).await {
            Ok(site) => service.run_indexing(site.id).await.map(|r| vec![r]),
            Err(e) => Err(e),
        },
        None => service.start_all().await,
    };
    interrupt.abort();

    for note in service.notifications().list() {
        info!("{}", note.message);
    }
    let difficult = service.difficult_words();
    if !difficult.is_empty() {
        info!(
            "{} words could not be lemmatized; see `lemmasearch difficult-words`",
            difficult.len()
        );
    }
    result
}

/// Index or re-index one page of a registered site
pub async fn cmd_index_page(config: &Config, store: Store, url: &str) -> Result<IndexedPageInfo> {
    let service = service(config, store, false).await?;
    if !config.is_allowed_domain(url) {
        warn!("{} is outside the configured sites", url);
    }
    let page = service.index_single_page(url).await?;
    Ok(page.into())
}

pub async fn cmd_remove_page(config: &Config, store: Store, url: &str) -> Result<()> {
    let service = service(config, store, false).await?;
    service.remove_page(url).await
}

/// Delete a site with all its pages, lemmas and postings
pub async fn cmd_remove_site(config: &Config, store: Store, url: &str) -> Result<Site> {
    let service = service(config, store, false).await?;
    let site = find_site(config, service.store(), url).await?;
    service.remove_site(site.id).await?;
    if config.site(&site.url).is_some() {
        warn!(
            "{} is still listed in the config and will be registered again",
            site.url
        );
    }
    Ok(site)
}

pub fn print_index_reports(reports: &[IndexingReport]) {
    println!("\n🔎 Indexing Results\n");

    if reports.is_empty() {
        println!("No sites were indexed.");
        return;
    }

    for report in reports {
        let marker = match report.status {
            SiteStatus::Indexed => "✓",
            SiteStatus::Stopped => "⚠",
            _ => "✗",
        };
        println!("{} {} [{}]", marker, report.site_url, report.status);
        println!(
            "  Pages: {} indexed, {} failed",
            report.pages_indexed, report.pages_failed
        );
        println!("  Links discovered: {}", report.links_discovered);
        if report.timed_out {
            println!("  Crawl stopped at the run time limit");
        }
        if let Some(error) = &report.error {
            println!("  Error: {}", error);
        }
        println!("  Session: {}", report.session_id);
        println!();
    }
}

pub fn print_indexed_page(page: &IndexedPageInfo) {
    println!("✓ Indexed {}", page.url);
    if let Some(title) = &page.title {
        println!("  Title: {}", title);
    }
    println!("  Path: {} (HTTP {})", page.path, page.code);
}
