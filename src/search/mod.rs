//! Ranked lemma search
//!
//! A query is lemmatized and each base form is looked up in the lemma table.
//! Lemmas seen on too many pages are dropped using a ceiling derived from the
//! corpus size. The rarest remaining lemma is the pivot: its postings are the
//! candidate pages. Each candidate then scores one point for every other
//! query lemma that also has a posting on it.

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::lemma::Lemmatizer;
use crate::parse::{extract_title, snippet};
use crate::store::{Lemma, Store};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// One ranked page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub site: String,
    pub site_name: String,
    pub uri: String,
    pub title: String,
    pub snippet: String,
    pub relevance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Candidates before pagination
    pub total_count: usize,
    pub results: Vec<SearchResult>,
}

/// Highest lemma frequency still considered discriminating for a corpus of
/// `total_pages` pages; `None` when the corpus is too small to rank.
pub fn frequency_ceiling(total_pages: usize) -> Option<i64> {
    if total_pages <= 1 {
        return None;
    }
    let n = total_pages as f64;
    Some((n * n.ln() / n).floor() as i64)
}

fn site_url_shape() -> Option<&'static Regex> {
    static SHAPE: OnceLock<Option<Regex>> = OnceLock::new();
    SHAPE
        .get_or_init(|| Regex::new(r"^(http|https)://.+").ok())
        .as_ref()
}

pub struct SearchEngine {
    store: Store,
    lemmatizer: Lemmatizer,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(store: Store, lemmatizer: Lemmatizer, config: SearchConfig) -> Self {
        Self {
            store,
            lemmatizer,
            config,
        }
    }

    /// Lemma counts of free text
    pub fn lemmatize(&self, text: &str) -> HashMap<String, u32> {
        self.lemmatizer.frequency_map(text)
    }

    /// The lemma rows a search would use, rarest first.
    ///
    /// With a site filter only that site's rows are considered. The ceiling
    /// always comes from the page count of the whole index. An unknown site
    /// yields nothing.
    pub async fn query_lemmas(&self, query: &str, site: Option<&str>) -> Result<Vec<Lemma>> {
        let site_id = match site {
            Some(url) => {
                if !site_url_shape().is_some_and(|re| re.is_match(url)) {
                    return Err(Error::Validation(format!("Invalid site URL: {}", url)));
                }
                match self.store.find_site_by_url(url).await? {
                    Some(site) => Some(site.id),
                    None => {
                        warn!("Site {} not found", url);
                        return Ok(Vec::new());
                    }
                }
            }
            None => None,
        };

        let total_pages = self.store.count_pages(None).await?;
        let Some(ceiling) = frequency_ceiling(total_pages) else {
            debug!("Corpus of {} pages is too small to rank", total_pages);
            return Ok(Vec::new());
        };

        let mut seen = HashSet::new();
        let mut lemmas = Vec::new();
        for form in self.lemmatizer.base_forms(query) {
            if !seen.insert(form.clone()) {
                continue;
            }
            for row in self.store.find_lemmas(&form, site_id).await? {
                if row.frequency > 0 && row.frequency <= ceiling {
                    lemmas.push(row);
                } else {
                    debug!(
                        "Dropping '{}' (frequency {}, ceiling {})",
                        row.lemma, row.frequency, ceiling
                    );
                }
            }
        }

        lemmas.sort_by_key(|l| l.frequency);
        Ok(lemmas)
    }

    /// Ranked, paginated search
    pub async fn search(
        &self,
        query: &str,
        site: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<SearchResponse> {
        if query.trim().is_empty() {
            return Err(Error::Validation("Query must not be empty".to_string()));
        }
        if limit == 0 {
            return Err(Error::Validation("Limit must be positive".to_string()));
        }
        let limit = limit.min(self.config.max_limit);

        let lemmas = self.query_lemmas(query, site).await?;
        let Some((pivot, others)) = lemmas.split_first() else {
            info!("No usable lemmas for query '{}'", query);
            return Ok(SearchResponse::default());
        };

        let postings = self.store.indices_for_lemma(pivot.id).await?;

        let mut other_pages = Vec::with_capacity(others.len());
        for lemma in others {
            let pages: HashSet<i64> = self
                .store
                .page_ids_for_lemma(lemma.id)
                .await?
                .into_iter()
                .collect();
            other_pages.push(pages);
        }

        let mut scored: Vec<(i64, usize)> = postings
            .iter()
            .map(|entry| {
                let score = other_pages
                    .iter()
                    .filter(|pages| pages.contains(&entry.page_id))
                    .count();
                (entry.page_id, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let total_count = scored.len();
        let mut results = Vec::new();
        for (page_id, score) in scored.into_iter().skip(offset).take(limit) {
            let Some(page) = self.store.get_page(page_id).await? else {
                continue;
            };
            let Some(site) = self.store.get_site(page.site_id).await? else {
                continue;
            };
            results.push(SearchResult {
                site: site.url,
                site_name: site.name,
                uri: page.path,
                title: extract_title(&page.content),
                snippet: snippet(&page.content, &pivot.lemma, self.config.snippet_radius),
                relevance: score as f64,
            });
        }

        info!(
            "Query '{}' matched {} pages via '{}'",
            query, total_count, pivot.lemma
        );
        Ok(SearchResponse {
            total_count,
            results,
        })
    }
}
