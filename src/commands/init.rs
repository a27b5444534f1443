//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::{Field, Store};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub base_dir: PathBuf,
    pub config_path: PathBuf,
    pub force: bool,
}

/// What `init` created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitInfo {
    pub config_path: String,
    pub db_path: String,
    pub fields: usize,
    pub sites: usize,
}

/// Write a default config, create the database and seed fields and sites.
///
/// Refuses to replace an existing config unless `force` is set.
pub async fn cmd_init(options: InitOptions) -> Result<InitInfo> {
    let InitOptions {
        base_dir,
        config_path,
        force,
    } = options;

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    let mut config = Config::default();

    config.paths.base_dir = base_dir.clone();
    config.paths.config_file = config_path;
    config.paths.db_file = base_dir.join("lemmasearch.db");
    config.save()?;

    let store = Store::connect(&config).await?;
    let (fields, sites) = seed(&config, &store).await?;

    info!(
        "Initialized {} with {} fields and {} sites",
        config.paths.base_dir.display(),
        fields,
        sites
    );

    Ok(InitInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        fields,
        sites,
    })
}

/// Seed the field table from `[fields]` and register every configured site
pub async fn seed(config: &Config, store: &Store) -> Result<(usize, usize)> {
    let fields = [
        Field::new("title", "title", config.fields.title_weight),
        Field::new("body", "body", config.fields.body_weight),
    ];
    store.seed_fields(&fields).await?;

    for site in &config.sites {
        store.register_site(&site.url, &site.name).await?;
    }

    Ok((fields.len(), config.sites.len()))
}

pub fn print_init(info: &InitInfo) {
    println!("\n✓ lemmasearch initialized\n");
    println!("Configuration: {}", info.config_path);
    println!("Database: {}", info.db_path);
    println!("Fields seeded: {}", info.fields);
    println!("Sites registered: {}", info.sites);
    if info.sites == 0 {
        println!("\nAdd [[sites]] entries to the config, then run 'lemmasearch index'.");
    }
}
