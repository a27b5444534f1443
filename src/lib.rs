//! lemmasearch: crawl a handful of sites, index their pages by lemma and
//! answer ranked full-text queries over the result.
//!
//! The pipeline runs crawl ([`crawl`]) → content weighting ([`parse`]) →
//! lemma persistence ([`index`]) → ranked lookup ([`search`]), with
//! everything stored in one SQLite database ([`store`]).

pub mod commands;
pub mod config;
pub mod crawl;
pub mod error;
pub mod history;
pub mod index;
pub mod lemma;
pub mod morph;
pub mod parse;
pub mod progress;
pub mod search;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
