use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tipsheet::config::{Backend, Config};
use tipsheet::content::{ContentDraft, NewPost};
use tipsheet::publish;
use tipsheet::related::{self, RelatedStrategy};
use tipsheet::scoring::{SeoReport, SeoScorer};
use tipsheet::search::{self, SearchOptions};
use tipsheet::storage::{ContentStore, Database, RestClient, StoreError};

/// Input files larger than this are rejected before reading.
const MAX_INPUT_SIZE: u64 = 10 * 1024 * 1024;

/// Get the config directory path (~/.config/tipsheet/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("tipsheet"))
}

#[derive(Parser, Debug)]
#[command(
    name = "tipsheet",
    about = "SEO scoring, search ranking and related posts for the tips site"
)]
struct Args {
    /// Config file (default: ~/.config/tipsheet/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a JSON content draft
    Score {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Search published posts
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show posts related to a post
    Related {
        post_id: i64,
        /// smart, category, trending or recent
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Recompute and store SEO scores
    #[command(group(ArgGroup::new("target").required(true).args(["post_id", "all"])))]
    Rescore {
        post_id: Option<i64>,
        #[arg(long)]
        all: bool,
    },
    /// Load a JSON array of posts into the local database
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so --json output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    tracing::debug!(config = ?config, "Effective configuration");

    match args.command {
        Command::Score { file } => {
            let draft: ContentDraft = read_json(&file)?;
            let report = SeoScorer::default().report(&draft);
            emit(args.json, &report, print_report)?;
        }
        Command::Search { query, limit } => {
            let store = open_store(&config, &config_dir).await?;
            let options = SearchOptions {
                limit: limit.unwrap_or(config.search_limit),
                max_query_length: config.max_query_length,
                ..SearchOptions::default()
            };
            let hits = search::search(store.as_ref(), &query, &options).await?;
            emit(args.json, &hits, |hits| {
                if hits.is_empty() {
                    println!("No results for \"{}\"", query.trim());
                }
                for hit in hits {
                    println!("{:>6.1}  {}  (/{})", hit.relevance_score, hit.title, hit.slug);
                }
            })?;
        }
        Command::Related {
            post_id,
            strategy,
            limit,
        } => {
            let store = open_store(&config, &config_dir).await?;
            let strategy = strategy
                .map(RelatedStrategy::from)
                .unwrap_or(config.related_strategy);
            let limit = limit.unwrap_or(config.related_limit);
            let related = related::select(store.as_ref(), post_id, strategy, limit).await;
            emit(args.json, &related, |related| {
                if let Some(err) = &related.error {
                    eprintln!("Warning: related posts unavailable: {err}");
                }
                println!("Related posts ({}):", related.strategy);
                for post in &related.posts {
                    println!("  {}  (/{})", post.title, post.slug);
                }
            })?;
        }
        Command::Rescore { post_id, all } => {
            let store = open_store(&config, &config_dir).await?;
            match post_id {
                Some(id) if !all => {
                    let report = publish::save_post(store.as_ref(), id)
                        .await
                        .with_context(|| format!("Failed to rescore post {id}"))?;
                    emit(args.json, &report, print_report)?;
                }
                _ => {
                    let summary = publish::rescore_all(store.as_ref())
                        .await
                        .context("Failed to list posts")?;
                    emit(args.json, &summary, |s| {
                        println!(
                            "Rescored {} posts: {} changed, {} failed",
                            s.scanned, s.updated, s.failed
                        );
                    })?;
                }
            }
        }
        Command::Import { file } => {
            if config.backend != Backend::Sqlite {
                anyhow::bail!("Import is only supported for the sqlite backend");
            }
            let posts: Vec<NewPost> = read_json(&file)?;
            let db = open_database(&config, &config_dir).await?;

            let mut imported = 0usize;
            let mut skipped = 0usize;
            for post in &posts {
                match db.create_post(post).await {
                    Ok(id) => {
                        tracing::debug!(post_id = id, title = %post.title, "Imported post");
                        imported += 1;
                    }
                    Err(e) => {
                        tracing::warn!(title = %post.title, error = %e, "Skipping post");
                        eprintln!("Skipped \"{}\": {e}", post.title);
                        skipped += 1;
                    }
                }
            }
            println!("Imported {imported} posts ({skipped} skipped)");
        }
    }

    Ok(())
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("Failed to serialize output")?
        );
    } else {
        human(value);
    }
    Ok(())
}

fn print_report(report: &SeoReport) {
    println!("SEO score: {}/100", report.score);
    for check in &report.checks {
        let mark = if check.passed() { "ok" } else { "!!" };
        println!(
            "  [{mark}] {:>2}/{:<2} {}",
            check.points, check.max_points, check.message
        );
    }
}

/// Read and decode a JSON input file, refusing anything that isn't a regular
/// file of reasonable size.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve input file: {}", path.display()))?;
    let metadata = std::fs::metadata(&canonical)?;
    if !metadata.is_file() {
        anyhow::bail!("Input path must be a regular file");
    }
    if metadata.len() > MAX_INPUT_SIZE {
        anyhow::bail!(
            "Input file is {} bytes (max {} bytes)",
            metadata.len(),
            MAX_INPUT_SIZE
        );
    }
    let content = std::fs::read_to_string(&canonical)
        .with_context(|| format!("Failed to read input file: {}", canonical.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", canonical.display()))
}

async fn open_store(config: &Config, config_dir: &Path) -> Result<Box<dyn ContentStore>> {
    match config.backend {
        Backend::Sqlite => Ok(Box::new(open_database(config, config_dir).await?)),
        Backend::Rest => {
            let base_url = config
                .rest_base_url
                .as_deref()
                .context("rest_base_url is not set")?;
            let http_client = reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::limited(3))
                .pool_idle_timeout(Duration::from_secs(30))
                .build()?;
            let client = RestClient::new(http_client, base_url, config.resolve_api_key())
                .context("Failed to create content API client")?;
            Ok(Box::new(client))
        }
    }
}

async fn open_database(config: &Config, config_dir: &Path) -> Result<Database> {
    let db_path = match &config.database_path {
        Some(path) => path.clone(),
        None => {
            ensure_private_dir(config_dir)?;
            config_dir.join("content.db")
        }
    };
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;

    match Database::open(db_path_str).await {
        Ok(db) => Ok(db),
        Err(StoreError::InstanceLocked) => {
            eprintln!("Error: The content database is locked by another process. Please close it and try again.");
            std::process::exit(1);
        }
        Err(e) => Err(anyhow::anyhow!("Failed to open database: {}", e)),
    }
}

fn ensure_private_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).context("Failed to create config directory")?;
        tracing::info!(path = %dir.display(), "Created config directory");
    }

    // User-only access on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(dir, perms) {
                    tracing::warn!(
                        path = %dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "Failed to read config directory metadata");
            }
        }
    }
    Ok(())
}
