//! # Grant Tagger CLI (`grants`)
//!
//! ## Usage
//!
//! ```bash
//! grants --config ./config/grants.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `grants init` | Create the SQLite database, run migrations, seed the vocabulary |
//! | `grants serve` | Start the HTTP API |
//! | `grants add` | Tag and store one grant |
//! | `grants list` | List grants, optionally filtered by tags |
//! | `grants tags` | Print the vocabulary |
//! | `grants synonyms add` | Create a synonym group |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use grant_tagger::config::{self, Config};
use grant_tagger::{db, llm, migrate, server, sqlite_store::SqliteStore, GrantService};

/// Grant Tagger: tag grants against a growing vocabulary and search them by tag.
#[derive(Parser)]
#[command(name = "grants", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/grants.toml`. When the file is missing, built-in
    /// defaults are used (database in `./data`, LLM disabled).
    #[arg(long, global = true, default_value = "./config/grants.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema and seed the vocabulary.
    ///
    /// Idempotent: running it again keeps existing data.
    Init,

    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Tag and store a single grant.
    Add {
        /// Grant name (must be unique).
        #[arg(long)]
        name: String,

        /// Grant description used for tagging.
        #[arg(long)]
        description: String,

        /// Website describing the grant. Requires an LLM.
        #[arg(long = "website")]
        website_urls: Vec<String>,

        /// PDF document describing the grant. Requires an LLM.
        #[arg(long = "document")]
        document_urls: Vec<String>,
    },

    /// List stored grants.
    List {
        /// Comma-separated tags; grants with any of them are returned.
        #[arg(long)]
        tags: Option<String>,

        /// Expand the selected tags through their synonym groups.
        #[arg(long)]
        synonyms: bool,
    },

    /// Print the tag vocabulary.
    Tags {
        /// Also print synonym groups.
        #[arg(long)]
        synonyms: bool,
    },

    /// Manage synonym groups.
    Synonyms {
        #[command(subcommand)]
        action: SynonymAction,
    },
}

#[derive(Subcommand)]
enum SynonymAction {
    /// Create a group from two or more vocabulary tags.
    Add {
        #[arg(required = true, num_args = 2..)]
        tags: Vec<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: &PathBuf) -> anyhow::Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        tracing::warn!(path = %path.display(), "config file not found; using defaults");
        Ok(Config::minimal())
    }
}

async fn open_service(cfg: &Config) -> anyhow::Result<GrantService> {
    let pool = db::connect(cfg).await?;
    migrate::migrate_pool(&pool).await?;
    let provider = llm::create_provider(&cfg.llm)?;
    Ok(GrantService::new(Arc::new(SqliteStore::new(pool)), provider))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Add {
            name,
            description,
            website_urls,
            document_urls,
        } => {
            let service = open_service(&cfg).await?;
            // Same validation path as POST /api/grants
            let payload = serde_json::json!({
                "grant_name": name,
                "grant_description": description,
                "website_urls": website_urls,
                "document_urls": document_urls,
            });
            let stored = service.submit(&payload).await?;
            for g in stored {
                println!("{}", g.name);
                println!("  tags: {}", g.tags.into_iter().collect::<Vec<_>>().join(", "));
            }
        }
        Commands::List { tags, synonyms } => {
            let service = open_service(&cfg).await?;
            let selected: Vec<String> = tags
                .as_deref()
                .map(|csv| csv.split(',').map(str::to_string).collect())
                .unwrap_or_default();
            let grants = service.list(&selected, synonyms).await?;
            if grants.is_empty() {
                println!("No grants.");
            }
            for g in grants {
                println!("{}", g.name);
                println!("  {}", g.description);
                println!("  tags: {}", g.tags.into_iter().collect::<Vec<_>>().join(", "));
            }
        }
        Commands::Tags { synonyms } => {
            let service = open_service(&cfg).await?;
            for tag in service.vocabulary().await? {
                println!("{}", tag);
            }
            if synonyms {
                println!();
                println!("--- Synonym groups ---");
                for group in service.synonym_groups().await? {
                    let members: Vec<_> = group.tags.into_iter().collect();
                    println!("[{}] {}", group.id, members.join(", "));
                }
            }
        }
        Commands::Synonyms { action } => match action {
            SynonymAction::Add { tags } => {
                let service = open_service(&cfg).await?;
                let id = service.create_synonym_group(&tags).await?;
                println!("Created synonym group {}.", id);
            }
        },
    }

    Ok(())
}
