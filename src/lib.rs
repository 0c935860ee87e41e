//! Card Sync - local card database synchronization
//!
//! Keeps a SQLite card database in sync with the Scryfall catalog, migrates
//! ManaPool seller inventory into the same schema, and backfills perceptual
//! image fingerprints used for visual card matching.

pub mod backfill;
pub mod database;
pub mod error;
pub mod fetch;
pub mod hashing;
pub mod ingest;
pub mod manapool;
pub mod migrate;
pub mod scryfall;

pub use error::{Result, SyncError};
