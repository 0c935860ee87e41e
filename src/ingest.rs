//! Set reconciliation and card ingestion from the Scryfall catalog
//!
//! `sync_new_sets` diffs the remote set listing against the local store and
//! ingests whatever is missing, one set at a time. Each search page commits
//! on its own, so a crash mid-run keeps every page already written.

use crate::database::{self, NewCard};
use crate::error::Result;
use crate::scryfall::{ScryfallClient, SetInfo};
use rusqlite::Connection;
use std::collections::HashSet;

/// Result of an ingestion run
#[derive(Debug, Default)]
pub struct IngestStats {
    /// Cards newly inserted
    pub inserted: usize,
    /// Cards already present (left untouched)
    pub skipped_existing: usize,
    /// Cards without a usable image, never inserted
    pub no_image: usize,
    /// Search pages walked
    pub pages: usize,
}

impl IngestStats {
    fn absorb(&mut self, other: &IngestStats) {
        self.inserted += other.inserted;
        self.skipped_existing += other.skipped_existing;
        self.no_image += other.no_image;
        self.pages += other.pages;
    }
}

/// Codes of playable remote sets that are not yet present locally.
///
/// Output preserves the remote listing's order; the remote service
/// documents no ordering guarantee, and ingestion is idempotent per set,
/// so no client-side sort is applied.
pub fn missing_set_codes(remote: &[SetInfo], existing: &HashSet<String>) -> Vec<String> {
    remote
        .iter()
        .filter(|set| set.is_playable())
        .filter(|set| !existing.contains(&set.code))
        .map(|set| set.code.clone())
        .collect()
}

/// Ingest every card of one set, walking the cursor-paginated search.
///
/// Cards without a usable image are skipped entirely: a row without an
/// image could never be fingerprinted later. Existing rows are left
/// untouched (see [`database::insert_card_if_absent`]).
pub async fn ingest_set(
    scryfall: &ScryfallClient,
    conn: &mut Connection,
    code: &str,
) -> Result<IngestStats> {
    log::info!("Fetching set: {}", code);

    let mut stats = IngestStats::default();
    let mut url = Some(scryfall.set_search_url(code));

    while let Some(page_url) = url {
        let page = scryfall.search_page(&page_url).await?;
        stats.pages += 1;

        // The page checkpoint: all rows of a page land together, and the
        // transaction never spans a network call.
        let tx = conn.transaction()?;
        for card in &page.data {
            let image_uri = match card.image_url() {
                Some(uri) => uri,
                None => {
                    stats.no_image += 1;
                    continue;
                }
            };

            let inserted = database::insert_card_if_absent(
                &tx,
                &NewCard {
                    scryfall_id: card.id.clone(),
                    name: card.name.clone(),
                    set_code: card.set.clone(),
                    collector_number: Some(card.collector_number.clone()),
                    rarity: Some(card.rarity.clone()),
                    image_uri: Some(image_uri.to_string()),
                },
            )?;
            if inserted {
                stats.inserted += 1;
            } else {
                stats.skipped_existing += 1;
            }
        }
        tx.commit()?;

        url = if page.has_more { page.next_page } else { None };
    }

    log::info!(
        "Set {}: {} cards inserted, {} already present, {} without images ({} pages)",
        code,
        stats.inserted,
        stats.skipped_existing,
        stats.no_image,
        stats.pages
    );
    Ok(stats)
}

/// Find catalog sets missing from the store and ingest them in the order
/// the remote listing returns them.
pub async fn sync_new_sets(scryfall: &ScryfallClient, conn: &mut Connection) -> Result<IngestStats> {
    let existing = database::existing_set_codes(conn)?;
    let remote = scryfall.sets().await?;
    let missing = missing_set_codes(&remote, &existing);

    if missing.is_empty() {
        log::info!(
            "Card database is up to date ({} local sets, {} remote)",
            existing.len(),
            remote.len()
        );
        return Ok(IngestStats::default());
    }

    log::info!("Found {} missing sets to download: {:?}", missing.len(), missing);

    let mut total = IngestStats::default();
    for code in &missing {
        let stats = ingest_set(scryfall, conn, code).await?;
        total.absorb(&stats);
    }

    log::info!(
        "Ingested {} sets: {} new cards, {} without images",
        missing.len(),
        total.inserted,
        total.no_image
    );
    Ok(total)
}
