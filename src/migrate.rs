//! ManaPool inventory migration into the local card store
//!
//! Walks the seller inventory feed with limit/offset pagination, maps each
//! single card onto the local schema and appends its inventory line. Each
//! page commits together with the feed offset it accounts for, so an
//! interrupted or repeated run resumes behind the last committed page
//! instead of re-reading the feed from the start.

use crate::database::{self, NewCard, NewInventoryRow};
use crate::error::Result;
use crate::manapool::{InventoryItem, ManapoolClient};
use crate::scryfall::ScryfallClient;
use rusqlite::Connection;

/// Batch label stamped on every migrated inventory line
pub const BATCH_LABEL: &str = "Legacy_ManaPool_Stock";

/// Items requested per page
pub const PAGE_LIMIT: u64 = 100;

/// sync_state key for the migration's high-water mark
const OFFSET_KEY: &str = "manapool_offset";

/// Offset pager over the marketplace feed.
///
/// A page returning fewer items than `limit` is the final one and leaves
/// the offset unchanged; only a full page advances it.
#[derive(Debug)]
pub struct Pager {
    pub offset: u64,
    pub limit: u64,
    pub has_more: bool,
}

impl Pager {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit,
            has_more: true,
        }
    }

    /// Feed the number of items the page returned; returns whether more
    /// pages remain
    pub fn advance(&mut self, returned: usize) -> bool {
        if (returned as u64) < self.limit {
            self.has_more = false;
        } else {
            self.offset += self.limit;
        }
        self.has_more
    }
}

/// A feed item mapped onto the local schema
#[derive(Debug, PartialEq)]
pub struct MappedItem {
    pub scryfall_id: String,
    pub name: String,
    pub set_code: String,
    pub condition: String,
    pub is_foil: bool,
    pub quantity: i64,
    pub listed_price: f64,
}

/// Map one feed item, or None when it is not a single card.
pub fn map_single(item: &InventoryItem) -> Option<MappedItem> {
    let single = item.single()?;
    Some(MappedItem {
        scryfall_id: single.scryfall_id.clone(),
        name: single.name.clone(),
        set_code: single.set.to_lowercase(),
        condition: single
            .condition_id
            .clone()
            .unwrap_or_else(|| "NM".to_string()),
        // "F" is the only finish code that means foil.
        is_foil: single.finish_id.as_deref() == Some("F"),
        quantity: item.quantity,
        listed_price: item.price_cents as f64 / 100.0,
    })
}

/// Result of a migration run
#[derive(Debug, Default)]
pub struct MigrateStats {
    /// Cards newly created (first sighting via the feed)
    pub cards_inserted: usize,
    /// Inventory lines appended
    pub inventory_rows: usize,
    /// Items skipped because they are sealed/boxed product
    pub skipped_non_single: usize,
    /// Items skipped because their quantity was not positive
    pub skipped_bad_quantity: usize,
    /// Sum of migrated quantities
    pub total_quantity: i64,
    /// Feed pages walked
    pub pages: usize,
}

/// Walk the seller inventory feed and append it to the local store.
pub async fn migrate(
    manapool: &ManapoolClient,
    scryfall: &ScryfallClient,
    conn: &mut Connection,
) -> Result<MigrateStats> {
    run_migration(manapool, scryfall, conn, PAGE_LIMIT).await
}

async fn run_migration(
    manapool: &ManapoolClient,
    scryfall: &ScryfallClient,
    conn: &mut Connection,
    limit: u64,
) -> Result<MigrateStats> {
    let start = database::get_sync_offset(conn, OFFSET_KEY)?.unwrap_or(0);
    if start > 0 {
        log::info!("Resuming migration from offset {}", start);
    }

    let mut pager = Pager::new(start, limit);
    let mut stats = MigrateStats::default();

    while pager.has_more {
        log::info!("Fetching inventory from offset {}...", pager.offset);
        let page = manapool.inventory_page(pager.limit, pager.offset).await?;
        stats.pages += 1;

        if page.inventory.is_empty() {
            log::info!("Empty page at offset {}, nothing left to migrate", pager.offset);
            break;
        }

        // Resolve per-item metadata before opening the transaction; the
        // page checkpoint must not span network calls.
        let mut resolved = Vec::new();
        for item in &page.inventory {
            let mapped = match map_single(item) {
                Some(mapped) => mapped,
                None => {
                    stats.skipped_non_single += 1;
                    continue;
                }
            };
            if mapped.quantity < 1 {
                log::warn!(
                    "Skipping {} with non-positive quantity {}",
                    mapped.scryfall_id,
                    mapped.quantity
                );
                stats.skipped_bad_quantity += 1;
                continue;
            }
            let meta = scryfall.card_metadata(&mapped.scryfall_id).await?;
            resolved.push((mapped, meta));
        }

        let returned = page.pagination.returned;

        // The page checkpoint: rows and the high-water mark commit
        // together, so a restart resumes exactly behind this page.
        let tx = conn.transaction()?;
        for (mapped, meta) in &resolved {
            let inserted = database::insert_card_if_absent(
                &tx,
                &NewCard {
                    scryfall_id: mapped.scryfall_id.clone(),
                    name: mapped.name.clone(),
                    set_code: mapped.set_code.clone(),
                    collector_number: meta.collector_number.clone(),
                    rarity: meta.rarity.clone(),
                    image_uri: None,
                },
            )?;
            if inserted {
                stats.cards_inserted += 1;
            }

            database::insert_inventory(
                &tx,
                &NewInventoryRow {
                    scryfall_id: mapped.scryfall_id.clone(),
                    condition: mapped.condition.clone(),
                    is_foil: mapped.is_foil,
                    quantity: mapped.quantity,
                    listed_price: mapped.listed_price,
                    box_label: BATCH_LABEL.to_string(),
                },
            )?;
            stats.inventory_rows += 1;
            stats.total_quantity += mapped.quantity;
        }
        database::set_sync_offset(&tx, OFFSET_KEY, pager.offset + returned as u64)?;
        tx.commit()?;

        pager.advance(returned);
    }

    log::info!(
        "Migration complete! {} inventory lines ({} total quantity), {} new cards, {} non-single items skipped ({} pages)",
        stats.inventory_rows,
        stats.total_quantity,
        stats.cards_inserted,
        stats.skipped_non_single,
        stats.pages
    );
    Ok(stats)
}
