use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::env;
use std::path::PathBuf;

use hr_vectors::config::Settings;
use hr_vectors::embedding::OpenAiEmbedder;
use hr_vectors::store::QdrantStore;
use hr_vectors::update::UpdatePlan;
use hr_vectors::{audit, search, seed, update, DEFAULT_LOG_FILTER};

#[derive(Parser)]
#[command(name = "hr-vectors")]
#[command(about = "Seed, search, update and audit the HR vector collections", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the collections and load the glossary, SQL history and catalog
    Seed,
    /// Search all three collections with one question
    Query {
        /// Question to embed
        query: Option<String>,
        #[arg(long, default_value_t = search::DEFAULT_LIMIT)]
        limit: u64,
    },
    /// Apply an update plan and record the change history
    Update {
        /// JSON plan; the built-in demo plan is used when omitted
        #[arg(long)]
        plan: Option<PathBuf>,
    },
    /// Report the change history
    Audit {
        /// Glossary term whose full history is shown
        #[arg(long, default_value_t = 1)]
        id: u64,
    },
}

#[actix_rt::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", DEFAULT_LOG_FILTER);
    }
    env_logger::init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    let store = QdrantStore::connect(&settings.qdrant_url)?;

    match cli.command {
        Commands::Seed => {
            let embedder = OpenAiEmbedder::from_settings(&settings)?;
            let summary = seed::seed_all(&store, &embedder)
                .await
                .context("seeding failed")?;
            println!("{}", seed::render_summary(&summary));
        }
        Commands::Query { query, limit } => {
            let embedder = OpenAiEmbedder::from_settings(&settings)?;
            let query = query.unwrap_or_else(|| search::DEFAULT_QUERY.to_string());
            let report = search::search_all(&store, &embedder, &query, limit)
                .await
                .context("search failed")?;
            print!("{}", search::render_report(&report));
        }
        Commands::Update { plan } => {
            let embedder = OpenAiEmbedder::from_settings(&settings)?;
            let plan = match plan {
                Some(path) => UpdatePlan::load(&path)?,
                None => UpdatePlan::builtin(),
            };
            let report = update::apply_plan(&store, &embedder, &plan)
                .await
                .context("update failed")?;
            print!("{}", update::render_report(&report));
        }
        Commands::Audit { id } => {
            print!("{}", audit::run_audit(&store, id).await?);
        }
    }

    Ok(())
}
