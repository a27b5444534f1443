//! Status, site listing and history commands

use crate::config::Config;
use crate::error::Result;
use crate::index::{IndexingService, Statistics};
use crate::store::{HistoryRecord, Store};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub db_path: String,
    pub statistics: Statistics,
}

/// Get system status
pub async fn cmd_status(config: &Config, store: Store) -> Result<StatusInfo> {
    info!("Getting status");

    let service = IndexingService::from_config(config, store).await?;
    let statistics = service.statistics().await?;

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        statistics,
    })
}

/// Registered site with its counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteInfo {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub status: String,
    pub status_time: String,
    pub last_error: Option<String>,
    pub pages: usize,
    pub lemmas: usize,
}

/// List all sites with their stats
pub async fn cmd_list_sites(store: &Store) -> Result<Vec<SiteInfo>> {
    let sites = store.list_sites().await?;
    let mut result = Vec::with_capacity(sites.len());

    for site in sites {
        let counts = store.site_counts(site.id).await?;
        result.push(SiteInfo {
            id: site.id,
            url: site.url,
            name: site.name,
            status: site.status,
            status_time: site.status_time,
            last_error: site.last_error,
            pages: counts.pages,
            lemmas: counts.lemmas,
        });
    }

    Ok(result)
}

/// Most recent persisted history records
pub async fn cmd_history(store: &Store, limit: usize) -> Result<Vec<HistoryRecord>> {
    store.list_history(limit).await
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    let total = &status.statistics.total;

    println!("\n📊 lemmasearch Status\n");
    println!("Configuration: {}", status.config_path);
    println!("Database: {}", status.db_path);
    println!("\nTotals:");
    println!("  Sites: {}", total.sites);
    println!("  Pages: {}", total.pages);
    println!("  Lemmas: {}", total.lemmas);
    println!(
        "  Indexing: {}",
        if total.indexing { "running" } else { "idle" }
    );

    if status.statistics.detailed.is_empty() {
        return;
    }

    println!("\nSites:");
    for site in &status.statistics.detailed {
        println!("  • {} [{}]", site.name, site.status);
        println!("    URL: {}", site.url);
        println!("    Pages: {}, Lemmas: {}", site.pages, site.lemmas);
        if let Some(error) = &site.error {
            println!("    Error: {}", error);
        }
    }
}

/// Print sites list to console
pub fn print_sites(sites: &[SiteInfo]) {
    println!("\n🌐 Registered Sites\n");

    if sites.is_empty() {
        println!("No sites registered. Add [[sites]] to the config and run 'lemmasearch index'.");
        return;
    }

    for site in sites {
        println!("• {} [{}]", site.name, site.status);
        println!("  ID: {}", site.id);
        println!("  URL: {}", site.url);
        println!("  Pages: {}, Lemmas: {}", site.pages, site.lemmas);
        println!("  Updated: {}", site.status_time);
        if let Some(error) = &site.last_error {
            println!("  Error: {}", error);
        }
        println!();
    }
}

pub fn print_history(records: &[HistoryRecord]) {
    if records.is_empty() {
        println!("No indexing history recorded.");
        return;
    }

    for record in records {
        println!(
            "{}  {:<8}  {}  ({})",
            record.timestamp, record.status, record.url, record.session_id
        );
    }
}
