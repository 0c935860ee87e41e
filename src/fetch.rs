//! Rate-limited HTTP fetching
//!
//! All outbound requests go through a single [`RateLimitedFetcher`] so the
//! 100 ms floor between requests holds across every component in the
//! process, not per caller.

use crate::error::{Result, SyncError};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const USER_AGENT: &str = "card_sync/1.0";

/// Minimum spacing between any two outbound requests
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(100);

/// Throttled HTTP client, the sole network gateway.
///
/// Share one value (behind `Arc`) between all API clients; the throttle is
/// only process-wide if everyone goes through the same fetcher.
pub struct RateLimitedFetcher {
    client: reqwest::Client,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimitedFetcher {
    pub fn new() -> Self {
        Self::with_min_interval(MIN_REQUEST_INTERVAL)
    }

    pub fn with_min_interval(min_interval: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Sleep until at least `min_interval` has passed since the previous
    /// request. The lock is held through the sleep so concurrent callers
    /// queue up instead of racing past the floor.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn request(&self, url: &str, bearer: Option<&str>) -> Result<reqwest::Response> {
        self.throttle().await;

        let mut request = self.client.get(url).header("User-Agent", USER_AGENT);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SyncError::HttpStatus(response.status()));
        }
        Ok(response)
    }

    /// GET a URL and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let bytes = self.request(url, None).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// GET a URL with a bearer token and decode the JSON body
    pub async fn get_json_authorized<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
    ) -> Result<T> {
        let bytes = self.request(url, Some(token)).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// GET a URL and return the raw body bytes (image downloads)
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        Ok(self.request(url, None).await?.bytes().await?.to_vec())
    }
}

impl Default for RateLimitedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Pong {
        ok: bool,
    }

    #[tokio::test]
    async fn get_json_decodes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let fetcher = RateLimitedFetcher::with_min_interval(Duration::ZERO);
        let pong: Pong = fetcher
            .get_json(&format!("{}/ping", server.uri()))
            .await
            .unwrap();
        assert!(pong.ok);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = RateLimitedFetcher::with_min_interval(Duration::ZERO);
        let result: Result<Pong> = fetcher.get_json(&format!("{}/missing", server.uri())).await;
        assert!(matches!(result, Err(SyncError::HttpStatus(status)) if status.as_u16() == 404));
    }

    #[tokio::test]
    async fn malformed_json_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/garbage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let fetcher = RateLimitedFetcher::with_min_interval(Duration::ZERO);
        let result: Result<Pong> = fetcher.get_json(&format!("{}/garbage", server.uri())).await;
        assert!(matches!(result, Err(SyncError::Decode(_))));
    }

    #[tokio::test]
    async fn requests_are_spaced_by_the_minimum_interval() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let fetcher = RateLimitedFetcher::with_min_interval(Duration::from_millis(50));
        let url = format!("{}/ping", server.uri());

        let start = Instant::now();
        for _ in 0..3 {
            let _: Pong = fetcher.get_json(&url).await.unwrap();
        }
        // Three requests means two enforced gaps.
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn bearer_token_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/private"))
            .and(header("Authorization", "Bearer sekrit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = RateLimitedFetcher::with_min_interval(Duration::ZERO);
        let pong: Pong = fetcher
            .get_json_authorized(&format!("{}/private", server.uri()), "sekrit")
            .await
            .unwrap();
        assert!(pong.ok);
    }
}
