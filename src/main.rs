//! card_sync - keeps a local card database in sync with the Scryfall
//! catalog, fingerprints stored card images and migrates ManaPool seller
//! inventory into the same schema.
//!
//! Each subcommand is one batch job meant to run to completion (typically
//! from cron); there is no long-lived process.

use card_sync::fetch::RateLimitedFetcher;
use card_sync::manapool::ManapoolClient;
use card_sync::scryfall::ScryfallClient;
use card_sync::{backfill, database, ingest, manapool, migrate, scryfall};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Arc;

/// Card database sync - ingests Scryfall card metadata, fingerprints card
/// images and migrates ManaPool inventory
#[derive(Parser, Debug)]
#[command(name = "card_sync")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value_t = default_db_path())]
    database: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest card metadata for catalog sets that are missing locally
    SyncSets {
        /// Scryfall API base URL
        #[arg(long, default_value = scryfall::DEFAULT_API_URL)]
        api_url: String,
    },
    /// Compute perceptual fingerprints for cards that lack one
    BackfillHashes,
    /// Migrate ManaPool seller inventory into the local store
    MigrateInventory {
        /// ManaPool API base URL
        #[arg(long, default_value = manapool::DEFAULT_API_URL)]
        api_url: String,

        /// Scryfall API base URL (per-card metadata lookups)
        #[arg(long, default_value = scryfall::DEFAULT_API_URL)]
        scryfall_url: String,

        /// Bearer token for the seller API (falls back to the
        /// MANAPOOL_API_TOKEN environment variable)
        #[arg(long)]
        token: Option<String>,
    },
}

/// Returns the default database path: ~/.local/share/card_sync/cards.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("card_sync")
        .join("cards.db")
        .to_string_lossy()
        .to_string()
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let db_path = PathBuf::from(&args.database);

    log::info!("Starting card_sync...");
    log::info!("Database path: {}", db_path.display());

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create database directory: {}", e);
                std::process::exit(1);
            }
            log::info!("Created directory: {}", parent.display());
        }
    }

    let mut conn = match Connection::open(&db_path) {
        Ok(conn) => {
            log::info!("Opened database: {}", db_path.display());
            conn
        }
        Err(e) => {
            log::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = database::init_schema(&conn) {
        log::error!("Failed to initialize database schema: {}", e);
        std::process::exit(1);
    }

    // One fetcher for the whole process; the rate limit is shared by every
    // component that talks to the network.
    let fetcher = Arc::new(RateLimitedFetcher::new());

    let result = match args.command {
        Command::SyncSets { api_url } => {
            let scryfall = ScryfallClient::new(Arc::clone(&fetcher), api_url);
            ingest::sync_new_sets(&scryfall, &mut conn).await.map(|_| ())
        }
        Command::BackfillHashes => backfill::backfill_hashes(&fetcher, &conn).await.map(|_| ()),
        Command::MigrateInventory {
            api_url,
            scryfall_url,
            token,
        } => {
            let token = match token.or_else(|| std::env::var("MANAPOOL_API_TOKEN").ok()) {
                Some(token) => token,
                None => {
                    log::error!(
                        "No ManaPool API token; pass --token or set MANAPOOL_API_TOKEN"
                    );
                    std::process::exit(1);
                }
            };
            let manapool = ManapoolClient::new(Arc::clone(&fetcher), api_url, token);
            let scryfall = ScryfallClient::new(Arc::clone(&fetcher), scryfall_url);
            migrate::migrate(&manapool, &scryfall, &mut conn)
                .await
                .map(|_| ())
        }
    };

    if let Err(e) = result {
        // Committed checkpoints up to this point are preserved; the job is
        // meant to be re-run rather than recovered in-process.
        log::error!("Run failed: {}", e);
        std::process::exit(1);
    }

    log::info!("Done.");
}
