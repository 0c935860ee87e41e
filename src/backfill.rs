//! Image fingerprint backfill
//!
//! Walks every card that has an image URI but no fingerprint, downloads
//! the image into memory, hashes it and stores the result. Images are
//! never written to disk; the deployment target may have nothing but a
//! fragile SD card under it.

use crate::database::{self, PendingHash};
use crate::error::Result;
use crate::fetch::RateLimitedFetcher;
use crate::hashing;
use rusqlite::Connection;

/// Result of a backfill pass
#[derive(Debug, Default)]
pub struct BackfillStats {
    /// Cards that received a fingerprint
    pub hashed: usize,
    /// Cards that failed (fetch, decode or store) and stay unhashed
    pub failed: usize,
}

/// Fingerprint every card that has an image URI but no hash yet.
///
/// Each row commits on its own, and each card's outcome is an explicit
/// result the loop inspects: one bad image is logged and counted, and the
/// pass moves on. Failed cards keep a NULL hash and are picked up again on
/// the next run.
pub async fn backfill_hashes(
    fetcher: &RateLimitedFetcher,
    conn: &Connection,
) -> Result<BackfillStats> {
    let pending = database::cards_missing_hash(conn)?;
    log::info!("{} cards awaiting an image fingerprint", pending.len());

    let mut stats = BackfillStats::default();
    for card in &pending {
        match hash_card(fetcher, conn, card).await {
            Ok(hash) => {
                log::info!("Successfully hashed {}: {}", card.scryfall_id, hash);
                stats.hashed += 1;
            }
            Err(e) => {
                log::warn!("Failed to hash {}: {}", card.scryfall_id, e);
                stats.failed += 1;
            }
        }
    }

    log::info!(
        "Backfill pass complete: {} hashed, {} failed",
        stats.hashed,
        stats.failed
    );
    Ok(stats)
}

/// Fetch, decode and fingerprint one card image, then store the hash.
/// The image lives entirely in memory for its whole lifetime.
async fn hash_card(
    fetcher: &RateLimitedFetcher,
    conn: &Connection,
    card: &PendingHash,
) -> Result<String> {
    let bytes = fetcher.get_bytes(&card.image_uri).await?;
    let img = image::load_from_memory(&bytes)?;
    let hash = hashing::fingerprint(&img);
    database::set_image_hash(conn, &card.scryfall_id, &hash)?;
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{insert_card_if_absent, make_test_card, test_db};
    use crate::hashing::FINGERPRINT_LEN;
    use rusqlite::params;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_fn(64, 64, |x, y| {
            image::Rgb([(x * 4) as u8, (y * 4) as u8, 128])
        });
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn stored_hash(conn: &Connection, id: &str) -> Option<String> {
        conn.query_row(
            "SELECT image_hash FROM cards WHERE scryfall_id = ?1",
            params![id],
            |row| row.get(0),
        )
        .unwrap()
    }

    fn card_with_image(id: &str, image_uri: &str) -> crate::database::NewCard {
        let mut card = make_test_card(id, "Test Card");
        card.image_uri = Some(image_uri.to_string());
        card
    }

    #[tokio::test]
    async fn backfill_fills_missing_hashes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/card.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
            .mount(&server)
            .await;

        let conn = test_db();
        let url = format!("{}/card.png", server.uri());
        insert_card_if_absent(&conn, &card_with_image("id-1", &url)).unwrap();

        let fetcher = RateLimitedFetcher::with_min_interval(Duration::ZERO);
        let stats = backfill_hashes(&fetcher, &conn).await.unwrap();

        assert_eq!(stats.hashed, 1);
        assert_eq!(stats.failed, 0);
        let hash = stored_hash(&conn, "id-1").unwrap();
        assert_eq!(hash.len(), FINGERPRINT_LEN);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn one_bad_image_does_not_stop_the_pass() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/good.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/corrupt.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not an image".to_vec()))
            .mount(&server)
            .await;

        let conn = test_db();
        insert_card_if_absent(
            &conn,
            &card_with_image("id-gone", &format!("{}/gone.png", server.uri())),
        )
        .unwrap();
        insert_card_if_absent(
            &conn,
            &card_with_image("id-corrupt", &format!("{}/corrupt.png", server.uri())),
        )
        .unwrap();
        insert_card_if_absent(
            &conn,
            &card_with_image("id-good", &format!("{}/good.png", server.uri())),
        )
        .unwrap();

        let fetcher = RateLimitedFetcher::with_min_interval(Duration::ZERO);
        let stats = backfill_hashes(&fetcher, &conn).await.unwrap();

        // Two rows fail, one succeeds, regardless of processing order.
        assert_eq!(stats.hashed, 1);
        assert_eq!(stats.failed, 2);
        assert!(stored_hash(&conn, "id-good").is_some());
        assert!(stored_hash(&conn, "id-gone").is_none());
        assert!(stored_hash(&conn, "id-corrupt").is_none());
    }

    #[tokio::test]
    async fn backfill_is_a_noop_once_everything_is_hashed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/card.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
            .expect(1)
            .mount(&server)
            .await;

        let conn = test_db();
        let url = format!("{}/card.png", server.uri());
        insert_card_if_absent(&conn, &card_with_image("id-1", &url)).unwrap();

        let fetcher = RateLimitedFetcher::with_min_interval(Duration::ZERO);
        backfill_hashes(&fetcher, &conn).await.unwrap();
        let first = stored_hash(&conn, "id-1").unwrap();

        // Second pass finds nothing to do and must not refetch.
        let stats = backfill_hashes(&fetcher, &conn).await.unwrap();
        assert_eq!(stats.hashed, 0);
        assert_eq!(stored_hash(&conn, "id-1").unwrap(), first);
    }
}
