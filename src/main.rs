//! lemmasearch CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use lemmasearch::{
    commands::{
        cmd_difficult_words, cmd_history, cmd_index, cmd_index_page, cmd_init, cmd_lemmas,
        cmd_lemmatize, cmd_list_sites, cmd_remove_page, cmd_remove_site, cmd_search, cmd_status,
        print_difficult_words, print_history, print_index_reports, print_indexed_page, print_init,
        print_lemma_counts, print_lemmas, print_search_results, print_sites, print_status,
        InitOptions,
    },
    config::Config,
    error::{Error, Result},
    progress::LogWriterFactory,
    store::Store,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "lemmasearch")]
#[command(version, about = "Crawl sites, index pages by lemma and search them", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit log lines as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and create the database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Crawl and index every configured site
    Index {
        /// Only index this site
        #[arg(long)]
        site: Option<String>,
    },

    /// Index or re-index a single page
    IndexPage {
        /// Page URL; must belong to a registered site
        url: String,
    },

    /// Remove an indexed page
    RemovePage { url: String },

    /// Remove a site with all its pages and lemmas
    RemoveSite { url: String },

    /// Ranked search over indexed pages
    Search {
        query: String,

        /// Restrict results to one site
        #[arg(long)]
        site: Option<String>,

        /// Number of results to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the lemmas a query would search for
    Lemmas {
        query: String,

        #[arg(long)]
        site: Option<String>,
    },

    /// Print the lemma counts of a text
    Lemmatize { text: String },

    /// List words in stored pages that could not be lemmatized
    DifficultWords {
        /// Only analyze pages of this site
        #[arg(long)]
        site: Option<String>,

        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },

    /// Show index statistics
    Status,

    /// List registered sites
    Sites,

    /// Show recent indexing history
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli).await {
        if json {
            debug!("{}", e);
            println!("{}", serde_json::json!({ "error": e.public_message() }));
        } else {
            error!("{}", e);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let (plain, structured) = if cli.log_json {
        (
            None,
            Some(fmt::layer().json().with_writer(LogWriterFactory)),
        )
    } else {
        (Some(fmt::layer().with_writer(LogWriterFactory)), None)
    };

    tracing_subscriber::registry()
        .with(plain)
        .with(structured)
        .with(filter)
        .init();

    // Handle init command specially (doesn't need existing config)
    if let Commands::Init { force } = cli.command {
        return handle_init(cli.config, force, cli.json).await;
    }

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "lemmasearch", &mut std::io::stdout());
        return Ok(());
    }

    // Lemmatizing free text needs neither the database nor a config file
    if let Commands::Lemmatize { text } = &cli.command {
        let config = match &cli.config {
            Some(path) => Config::load(path)?,
            None => Config::load_from(None)?,
        };
        let counts = cmd_lemmatize(&config, text)?;
        return output(cli.json, counts.as_slice(), print_lemma_counts);
    }

    let config = load_config(cli.config.as_deref())?;
    let store = Store::connect(&config).await?;
    let json = cli.json;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } | Commands::Lemmatize { .. } => {
            unreachable!()
        }

        Commands::Index { site } => {
            let reports = cmd_index(&config, store, site.as_deref(), !json).await?;
            output(json, &reports, |r| print_index_reports(r))?;
        }

        Commands::IndexPage { url } => {
            let page = cmd_index_page(&config, store, &url).await?;
            output(json, &page, print_indexed_page)?;
        }

        Commands::RemovePage { url } => {
            cmd_remove_page(&config, store, &url).await?;
            let removed = serde_json::json!({ "removed": url });
            output(json, &removed, |_| println!("✓ Removed {}", url))?;
        }

        Commands::RemoveSite { url } => {
            let site = cmd_remove_site(&config, store, &url).await?;
            output(json, &site, |s| println!("✓ Removed site {} ({})", s.name, s.url))?;
        }

        Commands::Search {
            query,
            site,
            offset,
            limit,
        } => {
            let response =
                cmd_search(&config, store, &query, site.as_deref(), offset, limit).await?;
            output(json, &response, |r| print_search_results(&query, r, offset))?;
        }

        Commands::Lemmas { query, site } => {
            let lemmas = cmd_lemmas(&config, store, &query, site.as_deref()).await?;
            output(json, &lemmas, |l| print_lemmas(l))?;
        }

        Commands::DifficultWords { site, limit } => {
            let words = cmd_difficult_words(&config, store, site.as_deref(), limit).await?;
            output(json, &words, |w| print_difficult_words(w))?;
        }

        Commands::Status => {
            let status = cmd_status(&config, store).await?;
            output(json, &status, print_status)?;
        }

        Commands::Sites => {
            let sites = cmd_list_sites(&store).await?;
            output(json, &sites, |s| print_sites(s))?;
        }

        Commands::History { limit } => {
            let records = cmd_history(&store, limit).await?;
            output(json, &records, |r| print_history(r))?;
        }
    }

    Ok(())
}

/// Print `value` as pretty JSON, or through its console printer
fn output<T, F>(json: bool, value: &T, print: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T),
{
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print(value);
    }
    Ok(())
}

async fn handle_init(config: Option<PathBuf>, force: bool, json: bool) -> Result<()> {
    // Get the base directory: if user specifies config file, use its parent dir
    // Otherwise use default base dir
    let (base_dir, config_path) = if let Some(path) = config {
        if path.extension().is_some_and(|e| e == "toml") {
            let base = path
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(Config::default_base_dir);
            (base, path)
        } else {
            (path.clone(), path.join("config.toml"))
        }
    } else {
        let base = Config::default_base_dir();
        (base.clone(), base.join("config.toml"))
    };

    let info = cmd_init(InitOptions {
        base_dir,
        config_path,
        force,
    })
    .await?;
    output(json, &info, print_init)
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_config_path);

    if !config_path.exists() {
        return Err(Error::Config(format!(
            "Config file not found: {}. Run 'lemmasearch init' first.",
            config_path.display()
        )));
    }

    Config::load(&config_path)
}
