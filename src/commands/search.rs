//! Search and query diagnostics commands

use crate::config::Config;
use crate::error::Result;
use crate::lemma::Lemmatizer;
use crate::parse::{ContentProcessor, FieldWeights};
use crate::search::{SearchEngine, SearchResponse};
use crate::store::{Lemma, Store};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One base form with its occurrence count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LemmaCount {
    pub lemma: String,
    pub count: u32,
}

/// A word the lemmatizer could not reduce, with its occurrence count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultWord {
    pub word: String,
    pub count: u64,
}

fn engine(config: &Config, store: Store) -> Result<SearchEngine> {
    let lemmatizer = Lemmatizer::from_config(&config.lemma)?;
    Ok(SearchEngine::new(store, lemmatizer, config.search.clone()))
}

/// Ranked search; `limit` falls back to `[search].default_limit`
pub async fn cmd_search(
    config: &Config,
    store: Store,
    query: &str,
    site: Option<&str>,
    offset: usize,
    limit: Option<usize>,
) -> Result<SearchResponse> {
    info!("Searching for: {}", query);
    let limit = limit.unwrap_or(config.search.default_limit);
    engine(config, store)?.search(query, site, offset, limit).await
}

/// Lemma rows a search for `query` would use, pivot first
pub async fn cmd_lemmas(
    config: &Config,
    store: Store,
    query: &str,
    site: Option<&str>,
) -> Result<Vec<Lemma>> {
    engine(config, store)?.query_lemmas(query, site).await
}

/// Lemma counts of free text, most frequent first
pub fn cmd_lemmatize(config: &Config, text: &str) -> Result<Vec<LemmaCount>> {
    let lemmatizer = Lemmatizer::from_config(&config.lemma)?;
    let mut counts: Vec<LemmaCount> = lemmatizer
        .frequency_map(text)
        .into_iter()
        .map(|(lemma, count)| LemmaCount { lemma, count })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.lemma.cmp(&b.lemma)));
    Ok(counts)
}

/// Re-run lemmatization over stored pages, of one site or all, and list
/// the words it could not reduce
pub async fn cmd_difficult_words(
    config: &Config,
    store: Store,
    site: Option<&str>,
    limit: usize,
) -> Result<Vec<DifficultWord>> {
    let site_id = match site {
        Some(url) => Some(super::index::find_site(config, &store, url).await?.id),
        None => None,
    };

    let processor = ContentProcessor::new(
        Lemmatizer::from_config(&config.lemma)?,
        FieldWeights::default(),
    );
    let pages = store.list_pages(site_id).await?;
    for page in &pages {
        processor.process(&page.content);
    }
    info!("Analyzed {} pages", pages.len());

    Ok(processor
        .lemmatizer()
        .difficult_words()
        .into_iter()
        .take(limit)
        .map(|(word, count)| DifficultWord { word, count })
        .collect())
}

pub fn print_search_results(query: &str, response: &SearchResponse, offset: usize) {
    println!("\n🔍 Results for: \"{}\"\n", query);

    if response.results.is_empty() {
        println!("No results found.");
        return;
    }

    for (i, result) in response.results.iter().enumerate() {
        let title = if result.title.is_empty() {
            result.uri.as_str()
        } else {
            result.title.as_str()
        };
        println!("{}. {} (relevance {:.1})", offset + i + 1, title, result.relevance);
        println!("   {}{}  [{}]", result.site, result.uri, result.site_name);
        if !result.snippet.is_empty() {
            println!("   {}", result.snippet);
        }
        println!();
    }

    println!(
        "Showing {}-{} of {}",
        offset + 1,
        offset + response.results.len(),
        response.total_count
    );
}

pub fn print_lemmas(lemmas: &[Lemma]) {
    if lemmas.is_empty() {
        println!("No usable lemmas.");
        return;
    }

    for (i, lemma) in lemmas.iter().enumerate() {
        let marker = if i == 0 { "*" } else { " " };
        println!(
            "{} {} (site {}, {} pages)",
            marker, lemma.lemma, lemma.site_id, lemma.frequency
        );
    }
}

pub fn print_difficult_words(words: &[DifficultWord]) {
    if words.is_empty() {
        println!("Every word was lemmatized.");
        return;
    }
    for entry in words {
        println!("{}\t{}", entry.count, entry.word);
    }
}

pub fn print_lemma_counts(counts: &[LemmaCount]) {
    for entry in counts {
        println!("{}\t{}", entry.count, entry.lemma);
    }
}
