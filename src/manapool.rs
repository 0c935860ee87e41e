//! ManaPool seller API client
//!
//! Read-only access to the authenticated seller inventory feed, paginated
//! with limit/offset.

use crate::error::Result;
use crate::fetch::RateLimitedFetcher;
use serde::Deserialize;
use std::sync::Arc;

pub const DEFAULT_API_URL: &str = "https://manapool.com/api/v1";

/// One page of the seller inventory feed
#[derive(Debug, Deserialize)]
pub struct InventoryPage {
    #[serde(default)]
    pub inventory: Vec<InventoryItem>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    /// Number of items in this page as reported by the server
    #[serde(default)]
    pub returned: usize,
}

/// One listing in the seller inventory
#[derive(Debug, Deserialize)]
pub struct InventoryItem {
    pub product_type: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub price_cents: i64,
    #[serde(default)]
    pub product: Option<Product>,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub single: Option<SingleCard>,
}

/// Card payload carried by `mtg_single` products
#[derive(Debug, Deserialize)]
pub struct SingleCard {
    pub scryfall_id: String,
    pub name: String,
    pub set: String,
    #[serde(default)]
    pub condition_id: Option<String>,
    #[serde(default)]
    pub finish_id: Option<String>,
}

impl InventoryItem {
    /// The single-card payload, present only for single cards (never for
    /// sealed or boxed product)
    pub fn single(&self) -> Option<&SingleCard> {
        if self.product_type != "mtg_single" {
            return None;
        }
        self.product.as_ref()?.single.as_ref()
    }
}

/// ManaPool API client bound to a base URL and bearer token
pub struct ManapoolClient {
    fetcher: Arc<RateLimitedFetcher>,
    base_url: String,
    token: String,
}

impl ManapoolClient {
    pub fn new(
        fetcher: Arc<RateLimitedFetcher>,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Fetch `limit` inventory items starting at `offset`
    pub async fn inventory_page(&self, limit: u64, offset: u64) -> Result<InventoryPage> {
        let url = format!(
            "{}/seller/inventory?limit={}&offset={}",
            self.base_url, limit, offset
        );
        self.fetcher.get_json_authorized(&url, &self.token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_payload_for_mtg_single() {
        let json = r#"{
            "product_type": "mtg_single",
            "quantity": 3,
            "price_cents": 1999,
            "product": {
                "single": {
                    "scryfall_id": "aaaa-1111",
                    "name": "Lightning Bolt",
                    "set": "M10",
                    "condition_id": "LP",
                    "finish_id": "F"
                }
            }
        }"#;

        let item: InventoryItem = serde_json::from_str(json).unwrap();
        let single = item.single().unwrap();
        assert_eq!(single.scryfall_id, "aaaa-1111");
        assert_eq!(single.finish_id.as_deref(), Some("F"));
        assert_eq!(item.quantity, 3);
    }

    #[test]
    fn sealed_product_has_no_single_payload() {
        let json = r#"{
            "product_type": "mtg_sealed",
            "quantity": 1,
            "price_cents": 9999,
            "product": {}
        }"#;

        let item: InventoryItem = serde_json::from_str(json).unwrap();
        assert!(item.single().is_none());
    }

    #[test]
    fn quantity_defaults_to_one() {
        let json = r#"{
            "product_type": "mtg_single",
            "price_cents": 100
        }"#;

        let item: InventoryItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.quantity, 1);
        // No product payload either; treated as not a usable single.
        assert!(item.single().is_none());
    }

    #[test]
    fn page_deserializes_with_missing_pagination() {
        let json = r#"{
            "inventory": []
        }"#;

        let page: InventoryPage = serde_json::from_str(json).unwrap();
        assert!(page.inventory.is_empty());
        assert_eq!(page.pagination.returned, 0);
    }
}
