//! Configuration management for lemmasearch
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Web crawling configuration
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Tokenization and morphology configuration
    #[serde(default)]
    pub lemma: LemmaConfig,

    /// Indexing engine configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Query configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Per-region scoring weights
    #[serde(default)]
    pub fields: FieldsConfig,

    /// Indexing history configuration
    #[serde(default)]
    pub history: HistoryConfig,

    /// Sites to crawl and index
    #[serde(default)]
    pub sites: Vec<SiteEntry>,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Web crawling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// User agent string
    #[serde(default = "default_crawl_user_agent")]
    pub user_agent: String,

    /// Referer header value
    #[serde(default = "default_crawl_referrer")]
    pub referrer: String,

    /// Request timeout in seconds
    #[serde(default = "default_crawl_timeout")]
    pub timeout_secs: u64,

    /// Wall-clock limit for one crawl run in seconds
    #[serde(default = "default_crawl_run_timeout")]
    pub run_timeout_secs: u64,

    /// How long in-flight fetches get to wind down after a stop
    #[serde(default = "default_crawl_shutdown_grace")]
    pub shutdown_grace_secs: u64,

    /// Maximum crawl depth from seed URL
    #[serde(default = "default_crawl_max_depth")]
    pub max_depth: u32,

    /// Maximum accepted links followed from one page
    #[serde(default = "default_crawl_max_links_per_page")]
    pub max_links_per_page: usize,

    /// Concurrent fetches; 0 uses the host CPU count
    #[serde(default = "default_crawl_concurrency")]
    pub concurrency: usize,

    /// Global request rate; 0 disables limiting
    #[serde(default = "default_crawl_requests_per_second")]
    pub requests_per_second: u32,

    /// Fetch attempts when loading content for persistence
    #[serde(default = "default_crawl_fetch_retries")]
    pub fetch_retries: u32,

    /// Backoff unit in milliseconds
    #[serde(default = "default_crawl_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Redirects followed per request
    #[serde(default = "default_crawl_max_redirects")]
    pub max_redirects: usize,
}

/// Which letters survive text normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alphabet {
    Cyrillic,
    Latin,
    #[default]
    Mixed,
}

/// Tokenization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LemmaConfig {
    /// Target alphabet
    #[serde(default)]
    pub alphabet: Alphabet,

    /// Shorter tokens are dropped before analysis
    #[serde(default = "default_lemma_min_word_chars")]
    pub min_word_chars: usize,

    /// Extra morphology dictionary (TOML)
    #[serde(default)]
    pub dictionary: Option<PathBuf>,
}

/// How a page URL is matched to a registered site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteMatch {
    /// Host must equal the site's host
    #[default]
    Exact,
    /// Exact first, then any site whose URL contains the host
    Partial,
}

/// Indexing engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Concurrent lemma/index upserts per page
    #[serde(default = "default_index_upsert_workers")]
    pub upsert_workers: usize,

    /// Attempts for an upsert that hit a locked database
    #[serde(default = "default_index_conflict_retries")]
    pub conflict_retries: u32,

    /// Site resolution strategy
    #[serde(default)]
    pub site_match: SiteMatch,
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default number of results
    #[serde(default = "default_search_limit")]
    pub default_limit: usize,

    /// Maximum results allowed per request
    #[serde(default = "default_search_max_limit")]
    pub max_limit: usize,

    /// Tokens shown on each side of the matched word
    #[serde(default = "default_search_snippet_radius")]
    pub snippet_radius: usize,
}

/// Scoring weights seeded into the field table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldsConfig {
    #[serde(default = "default_title_weight")]
    pub title_weight: f64,

    #[serde(default = "default_body_weight")]
    pub body_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Persist completed sessions
    #[serde(default = "default_history_persist")]
    pub persist: bool,
}

/// A site registered for indexing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteEntry {
    pub url: String,
    pub name: String,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for lemmasearch data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawl: CrawlConfig::default(),
            lemma: LemmaConfig::default(),
            index: IndexConfig::default(),
            search: SearchConfig::default(),
            fields: FieldsConfig::default(),
            history: HistoryConfig::default(),
            sites: Vec::new(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            user_agent: default_crawl_user_agent(),
            referrer: default_crawl_referrer(),
            timeout_secs: default_crawl_timeout(),
            run_timeout_secs: default_crawl_run_timeout(),
            shutdown_grace_secs: default_crawl_shutdown_grace(),
            max_depth: default_crawl_max_depth(),
            max_links_per_page: default_crawl_max_links_per_page(),
            concurrency: default_crawl_concurrency(),
            requests_per_second: default_crawl_requests_per_second(),
            fetch_retries: default_crawl_fetch_retries(),
            retry_backoff_ms: default_crawl_retry_backoff_ms(),
            max_redirects: default_crawl_max_redirects(),
        }
    }
}

impl CrawlConfig {
    /// Effective worker count for the crawl pool
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency == 0 {
            num_cpus::get().max(1)
        } else {
            self.concurrency
        }
    }
}

impl Default for LemmaConfig {
    fn default() -> Self {
        Self {
            alphabet: Alphabet::default(),
            min_word_chars: default_lemma_min_word_chars(),
            dictionary: None,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            upsert_workers: default_index_upsert_workers(),
            conflict_retries: default_index_conflict_retries(),
            site_match: SiteMatch::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_search_limit(),
            max_limit: default_search_max_limit(),
            snippet_radius: default_search_snippet_radius(),
        }
    }
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            title_weight: default_title_weight(),
            body_weight: default_body_weight(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            persist: default_history_persist(),
        }
    }
}

impl Config {
    /// Get the default base directory for lemmasearch (~/.lemmasearch)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".lemmasearch")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    pub fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: base.join("lemmasearch.db"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: base.join("lemmasearch.db"),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Check if lemmasearch is initialized (config and DB exist)
    pub fn is_initialized(&self) -> bool {
        self.paths.config_file.exists() && self.paths.db_file.exists()
    }

    /// Find a configured site by URL
    pub fn site(&self, url: &str) -> Option<&SiteEntry> {
        let wanted = url.trim_end_matches('/');
        self.sites
            .iter()
            .find(|s| s.url.trim_end_matches('/') == wanted)
    }

    /// Whether the URL's host belongs to one of the configured sites
    pub fn is_allowed_domain(&self, url: &str) -> bool {
        let Ok(input) = Url::parse(url) else {
            return false;
        };
        let Some(host) = input.host_str() else {
            return false;
        };
        self.sites.iter().any(|site| {
            Url::parse(&site.url)
                .ok()
                .and_then(|u| u.host_str().map(|h| h.eq_ignore_ascii_case(host)))
                .unwrap_or(false)
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.crawl.timeout_secs == 0 {
            return Err(Error::Config("crawl.timeout_secs must be positive".to_string()));
        }

        if self.crawl.run_timeout_secs == 0 {
            return Err(Error::Config(
                "crawl.run_timeout_secs must be positive".to_string(),
            ));
        }

        if self.crawl.fetch_retries == 0 {
            return Err(Error::Config(
                "crawl.fetch_retries must be at least 1".to_string(),
            ));
        }

        if self.lemma.min_word_chars == 0 {
            return Err(Error::Config(
                "lemma.min_word_chars must be at least 1".to_string(),
            ));
        }

        if self.index.upsert_workers == 0 {
            return Err(Error::Config(
                "index.upsert_workers must be at least 1".to_string(),
            ));
        }

        if self.search.default_limit == 0 || self.search.default_limit > self.search.max_limit {
            return Err(Error::Config(
                "search.default_limit must be between 1 and search.max_limit".to_string(),
            ));
        }

        if self.fields.title_weight < 0.0 || self.fields.body_weight < 0.0 {
            return Err(Error::Config(
                "fields weights must be non-negative".to_string(),
            ));
        }

        for site in &self.sites {
            if site.name.trim().is_empty() {
                return Err(Error::Config(format!("site {} has no name", site.url)));
            }
            if !crate::crawl::is_valid(&site.url) {
                return Err(Error::Config(format!("site URL is invalid: {}", site.url)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.crawl.timeout_secs, 10);
        assert_eq!(config.crawl.max_depth, 10);
        assert_eq!(config.fields.body_weight, 0.8);
        assert_eq!(config.index.site_match, SiteMatch::Exact);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        config.sites.push(SiteEntry {
            url: "https://example.com".to_string(),
            name: "Example".to_string(),
        });
        config.lemma.alphabet = Alphabet::Cyrillic;

        config.save().unwrap();
        assert!(config.paths.config_file.exists());

        let loaded = Config::load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(loaded.sites, config.sites);
        assert_eq!(loaded.lemma.alphabet, Alphabet::Cyrillic);
        assert_eq!(loaded.paths.db_file, tmp.path().join("lemmasearch.db"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.fields.body_weight = -0.1;
        assert!(config.validate().is_err());

        config.fields.body_weight = 0.5;
        assert!(config.validate().is_ok());

        config.search.default_limit = config.search.max_limit + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_site_validation() {
        let mut config = Config::default();
        config.sites.push(SiteEntry {
            url: "ftp://files.example.com".to_string(),
            name: "Files".to_string(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_allowed_domain_ignores_case() {
        let mut config = Config::default();
        config.sites.push(SiteEntry {
            url: "https://Example.com/".to_string(),
            name: "Example".to_string(),
        });
        assert!(config.is_allowed_domain("https://example.com/about"));
        assert!(!config.is_allowed_domain("https://other.org/"));
        assert!(config.site("https://Example.com").is_some());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [crawl]
            max_depth = 3

            [index]
            site_match = "partial"
            "#,
        )
        .unwrap();
        assert_eq!(config.crawl.max_depth, 3);
        assert_eq!(config.crawl.fetch_retries, 3);
        assert_eq!(config.index.site_match, SiteMatch::Partial);
        assert_eq!(config.lemma.alphabet, Alphabet::Mixed);
    }
}
