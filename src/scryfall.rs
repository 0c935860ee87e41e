//! Scryfall API client for catalog sets and card metadata
//!
//! Uses async reqwest via the shared rate-limited fetcher.

use crate::error::Result;
use crate::fetch::RateLimitedFetcher;
use serde::Deserialize;
use std::sync::Arc;

pub const DEFAULT_API_URL: &str = "https://api.scryfall.com";

/// Set types that correspond to playable paper releases. Token, digital-only
/// and promotional set types are excluded so the store never accumulates
/// non-playable inventory.
pub const PLAYABLE_SET_TYPES: [&str; 4] = ["core", "expansion", "masters", "draft_innovation"];

/// One set from the catalog's set listing
#[derive(Debug, Deserialize)]
pub struct SetInfo {
    pub code: String,
    #[serde(default)]
    pub set_type: String,
}

impl SetInfo {
    pub fn is_playable(&self) -> bool {
        PLAYABLE_SET_TYPES.contains(&self.set_type.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct SetListResponse {
    #[serde(default)]
    data: Vec<SetInfo>,
}

/// One page of cursor-paginated search results
#[derive(Debug, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub data: Vec<ScryfallCard>,
    #[serde(default)]
    pub has_more: bool,
    /// Opaque URL of the next page, present while `has_more` is true
    #[serde(default)]
    pub next_page: Option<String>,
}

/// Scryfall card as returned by the search endpoint
#[derive(Debug, Deserialize)]
pub struct ScryfallCard {
    pub id: String,
    pub name: String,
    pub set: String,
    pub collector_number: String,
    pub rarity: String,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
    /// For double-faced cards, images are in card_faces
    #[serde(default)]
    pub card_faces: Option<Vec<CardFace>>,
}

#[derive(Debug, Deserialize)]
pub struct ImageUris {
    pub small: Option<String>,
    pub normal: Option<String>,
    pub large: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CardFace {
    pub name: String,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
}

impl ScryfallCard {
    /// Get the primary image URL (normal size)
    pub fn image_url(&self) -> Option<&str> {
        // Try direct image_uris first
        if let Some(ref uris) = self.image_uris {
            return uris.normal.as_deref();
        }
        // For double-faced cards, get front face image
        if let Some(ref faces) = self.card_faces {
            if let Some(face) = faces.first() {
                if let Some(ref uris) = face.image_uris {
                    return uris.normal.as_deref();
                }
            }
        }
        None
    }
}

/// Subset of the card-by-id response used to complete marketplace rows
#[derive(Debug, Deserialize)]
pub struct CardMetadata {
    #[serde(default)]
    pub collector_number: Option<String>,
    #[serde(default)]
    pub rarity: Option<String>,
}

/// Scryfall API client bound to a base URL
pub struct ScryfallClient {
    fetcher: Arc<RateLimitedFetcher>,
    base_url: String,
}

impl ScryfallClient {
    pub fn new(fetcher: Arc<RateLimitedFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    /// Fetch the full remote set listing
    pub async fn sets(&self) -> Result<Vec<SetInfo>> {
        log::debug!("Fetching set listing from Scryfall");
        let response: SetListResponse = self
            .fetcher
            .get_json(&format!("{}/sets", self.base_url))
            .await?;
        Ok(response.data)
    }

    /// URL of the first search page for all cards in a set
    pub fn set_search_url(&self, code: &str) -> String {
        format!(
            "{}/cards/search?q={}",
            self.base_url,
            urlencoding::encode(&format!("set:{}", code))
        )
    }

    /// Fetch one search page; `url` is either the first page built by
    /// [`Self::set_search_url`] or a `next_page` cursor from a prior page
    pub async fn search_page(&self, url: &str) -> Result<SearchPage> {
        self.fetcher.get_json(url).await
    }

    /// Fetch collector number and rarity for a card by its Scryfall id
    pub async fn card_metadata(&self, scryfall_id: &str) -> Result<CardMetadata> {
        self.fetcher
            .get_json(&format!("{}/cards/{}", self.base_url, scryfall_id))
            .await
    }
}

#[cfg(test)]
#[path = "scryfall_tests.rs"]
mod tests;
