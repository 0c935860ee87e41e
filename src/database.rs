//! Database operations for the card store
//!
//! Uses parameterized queries exclusively (no SQL string concatenation).
//! Multi-row checkpoints are wrapped in explicit transactions by the
//! callers; single-row writes rely on SQLite's autocommit.

use rusqlite::{params, Connection};
use std::collections::HashSet;

/// Result type for database operations
pub type DbResult<T> = rusqlite::Result<T>;

/// Initialize the database schema
///
/// Creates tables if they don't exist:
/// - `cards`: one row per printing, keyed by Scryfall id
/// - `inventory`: append-only quantity/condition/price lines
/// - `sync_state`: durable high-water marks for resumable jobs
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS cards (
            scryfall_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            set_code TEXT NOT NULL,
            collector_number TEXT,
            rarity TEXT,
            image_uri TEXT,
            image_hash TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_cards_set_code ON cards(set_code);

        CREATE TABLE IF NOT EXISTS inventory (
            scryfall_id TEXT NOT NULL,
            condition TEXT NOT NULL,
            is_foil INTEGER NOT NULL,
            quantity INTEGER NOT NULL,
            listed_price REAL NOT NULL,
            box_label TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (scryfall_id) REFERENCES cards(scryfall_id)
        );

        CREATE INDEX IF NOT EXISTS idx_inventory_scryfall_id ON inventory(scryfall_id);

        CREATE TABLE IF NOT EXISTS sync_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )?;

    log::info!("Database schema initialized");
    Ok(())
}

/// A card row as written by ingestion or migration
#[derive(Debug, Clone)]
pub struct NewCard {
    pub scryfall_id: String,
    pub name: String,
    pub set_code: String,
    pub collector_number: Option<String>,
    pub rarity: Option<String>,
    pub image_uri: Option<String>,
}

/// Insert a card unless a row with the same Scryfall id already exists.
///
/// First ingestion wins: on conflict the new values are discarded and no
/// field of the existing row is touched, so re-running a sync is a no-op
/// for rows that exist. This also freezes name/rarity/collector number as
/// of first sighting; whether upstream corrections should instead
/// propagate as updates is unresolved, and tests pin the current behavior.
///
/// Returns true if a row was inserted.
pub fn insert_card_if_absent(conn: &Connection, card: &NewCard) -> DbResult<bool> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO cards
         (scryfall_id, name, set_code, collector_number, rarity, image_uri)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    let changed = stmt.execute(params![
        &card.scryfall_id,
        &card.name,
        &card.set_code,
        &card.collector_number,
        &card.rarity,
        &card.image_uri,
    ])?;
    Ok(changed > 0)
}

/// Set codes currently present in the store
pub fn existing_set_codes(conn: &Connection) -> DbResult<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT set_code FROM cards")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.collect()
}

/// A card awaiting a fingerprint
#[derive(Debug)]
pub struct PendingHash {
    pub scryfall_id: String,
    pub image_uri: String,
}

/// Cards with an image URI but no fingerprint yet
pub fn cards_missing_hash(conn: &Connection) -> DbResult<Vec<PendingHash>> {
    let mut stmt = conn.prepare(
        "SELECT scryfall_id, image_uri FROM cards
         WHERE image_hash IS NULL AND image_uri IS NOT NULL",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(PendingHash {
            scryfall_id: row.get(0)?,
            image_uri: row.get(1)?,
        })
    })?;
    rows.collect()
}

/// Store a card's fingerprint. Written once per card, never reset.
pub fn set_image_hash(conn: &Connection, scryfall_id: &str, hash: &str) -> DbResult<()> {
    conn.execute(
        "UPDATE cards SET image_hash = ?1 WHERE scryfall_id = ?2",
        params![hash, scryfall_id],
    )?;
    Ok(())
}

/// An inventory line as appended by the marketplace migration
#[derive(Debug, Clone)]
pub struct NewInventoryRow {
    pub scryfall_id: String,
    pub condition: String,
    pub is_foil: bool,
    pub quantity: i64,
    pub listed_price: f64,
    pub box_label: String,
}

/// Append one inventory line. The table has no uniqueness constraint;
/// repeated inserts for the same card produce separate rows.
pub fn insert_inventory(conn: &Connection, row: &NewInventoryRow) -> DbResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO inventory
         (scryfall_id, condition, is_foil, quantity, listed_price, box_label)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    stmt.execute(params![
        &row.scryfall_id,
        &row.condition,
        row.is_foil,
        row.quantity,
        row.listed_price,
        &row.box_label,
    ])?;
    Ok(())
}

/// Read a durable offset for a resumable job, if one was ever committed
pub fn get_sync_offset(conn: &Connection, key: &str) -> DbResult<Option<u64>> {
    let mut stmt = conn.prepare("SELECT value FROM sync_state WHERE key = ?1")?;
    let mut rows = stmt.query(params![key])?;
    match rows.next()? {
        Some(row) => {
            let value: String = row.get(0)?;
            Ok(value.parse().ok())
        }
        None => Ok(None),
    }
}

/// Store a durable offset. Call inside the same transaction as the rows
/// the offset accounts for, so the mark never runs ahead of the data.
pub fn set_sync_offset(conn: &Connection, key: &str, offset: u64) -> DbResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO sync_state (key, value) VALUES (?1, ?2)",
        params![key, offset.to_string()],
    )?;
    Ok(())
}

/// Get total count of cards in the store
pub fn card_count(conn: &Connection) -> DbResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))
}

/// Get total count of inventory lines
pub fn inventory_count(conn: &Connection) -> DbResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM inventory", [], |row| row.get(0))
}

#[cfg(test)]
pub use tests::{make_test_card, test_db};
