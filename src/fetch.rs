//! Rate-limited HTTP fetcher backed by the response cache.
//!
//! [`SiteClient`] is the single road to the network for every component:
//! topic discovery, listing pagination, article pages, and comment-count
//! queries all go through [`SiteClient::get`]. The call order is always
//! cache → network → cache-fill, so a URL is fetched at most once per
//! cache lifetime.
//!
//! # Throttle handling
//!
//! A 429 response triggers a bounded retry loop: the wait is the server's
//! `Retry-After` value when it parses as whole seconds, otherwise an
//! exponential delay (base 10 s, doubling per attempt, capped at 60 s),
//! plus up to 250 ms of jitter. After [`DEFAULT_MAX_ATTEMPTS`] rate-limited
//! attempts on the same URL the fetcher gives up with
//! [`DigestError::RetriesExhausted`] rather than retrying forever.
//!
//! [`DigestError::RetriesExhausted`]: crate::errors::DigestError::RetriesExhausted

use crate::cache::{CachedResponse, ResponseCache};
use crate::errors::{DigestError, Result};
use crate::utils::sleep_with_countdown;
use rand::{rng, Rng};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

/// Root of the tutorial site; topic URLs and relative hrefs resolve against it.
pub const BASE_URL: &str = "https://realpython.com";

/// Rate-limited attempts per URL before giving up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Fallback backoff base when the server sends no usable `Retry-After`.
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(10);

/// Ceiling for the exponential backoff delay.
const MAX_DELAY: Duration = Duration::from_secs(60);

/// HTTP client plus response cache; the only component that touches the network.
#[derive(Debug)]
pub struct SiteClient {
    http: Client,
    cache: ResponseCache,
    max_attempts: usize,
    base_delay: Duration,
    comment_endpoint: String,
}

impl SiteClient {
    /// Build a client with the crate's User-Agent and sane timeouts.
    pub fn new() -> Result<Self> {
        let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let http = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            cache: ResponseCache::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            comment_endpoint: crate::scrapers::comments::COUNT_ENDPOINT.to_string(),
        })
    }

    /// Override the throttle retry policy. Mainly for tests, which want a
    /// small attempt budget and no ten-second waits.
    pub fn with_retry_policy(mut self, max_attempts: usize, base_delay: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.base_delay = base_delay;
        self
    }

    /// Point comment-count queries at a different endpoint. Mainly for
    /// tests, which stand in a mock server for the count service.
    pub fn with_comment_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.comment_endpoint = endpoint.into();
        self
    }

    /// The count-data endpoint comment queries are issued against.
    pub fn comment_endpoint(&self) -> &str {
        &self.comment_endpoint
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ResponseCache {
        &mut self.cache
    }

    /// Fetch `url`, consulting the cache first.
    ///
    /// - Cache hit: returned immediately, no network I/O.
    /// - 200: snapshotted into the cache and returned.
    /// - 429: bounded backoff-and-retry (see module docs); exhaustion is
    ///   [`DigestError::RetriesExhausted`].
    /// - Anything else: [`DigestError::UnsuccessfulFetch`].
    #[instrument(level = "info", skip(self))]
    pub async fn get(&mut self, url: &str) -> Result<CachedResponse> {
        if let Some(hit) = self.cache.get(url) {
            info!(content_length = hit.body.len(), from_cache = true, "Fetched");
            return Ok(hit.clone());
        }

        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let response = self.http.get(url).send().await?;
            let status = response.status();

            if status == StatusCode::OK {
                let headers = snapshot_headers(&response);
                let body = response.text().await?;
                info!(
                    content_length = body.len(),
                    from_cache = false,
                    "Fetched"
                );
                let snapshot = CachedResponse::new(status.as_u16(), headers, body);
                self.cache.put(url, snapshot.clone());
                return Ok(snapshot);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= self.max_attempts {
                    warn!(attempt, "Rate-limit retries exhausted");
                    return Err(DigestError::RetriesExhausted {
                        url: url.to_string(),
                        attempts: attempt,
                    });
                }

                let delay = self.throttle_delay(&response, attempt);
                warn!(
                    attempt,
                    max = self.max_attempts,
                    delay_secs = delay.as_secs(),
                    "Received status code 429: too many requests; backing off"
                );
                sleep_with_countdown(delay.as_secs()).await;
                let jitter_ms: u64 = rng().random_range(0..=250);
                sleep(Duration::from_millis(jitter_ms)).await;
                continue;
            }

            warn!(status = status.as_u16(), "Unsuccessful fetch");
            return Err(DigestError::UnsuccessfulFetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
    }

    /// Wait before retry `attempt + 1`: server-directed when `Retry-After`
    /// parses as whole seconds, otherwise exponential from the base delay.
    fn throttle_delay(&self, response: &reqwest::Response, attempt: usize) -> Duration {
        let server_directed = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        match server_directed {
            Some(secs) => Duration::from_secs(secs),
            None => {
                let factor = 1u32 << (attempt.min(6) as u32 - 1);
                let delay = self.base_delay.saturating_mul(factor);
                delay.min(MAX_DELAY)
            }
        }
    }
}

fn snapshot_headers(response: &reqwest::Response) -> HashMap<String, String> {
    response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_client() -> SiteClient {
        SiteClient::new()
            .unwrap()
            .with_retry_policy(3, Duration::from_secs(0))
    }

    #[tokio::test]
    async fn test_successful_fetch_populates_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>body</html>"))
            .mount(&server)
            .await;

        let mut client = fast_client();
        let url = format!("{}/article/", server.uri());
        let response = client.get(&url).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "<html>body</html>");
        assert!(client.cache().get(&url).is_some());
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/once/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("cached"))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = fast_client();
        let url = format!("{}/once/", server.uri());

        let first = client.get(&url).await.unwrap();
        let second = client.get(&url).await.unwrap();
        assert_eq!(first.body, second.body);
        // The expect(1) mock panics on drop if a second request went out.
    }

    #[tokio::test]
    async fn test_non_200_is_unsuccessful_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut client = fast_client();
        let url = format!("{}/gone/", server.uri());

        match client.get(&url).await {
            Err(DigestError::UnsuccessfulFetch { status, .. }) => assert_eq!(status, 404),
            other => panic!("expected UnsuccessfulFetch, got {other:?}"),
        }
        assert!(client.cache().get(&url).is_none());
    }

    #[tokio::test]
    async fn test_429_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/busy/"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/busy/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("finally"))
            .mount(&server)
            .await;

        let mut client = fast_client();
        let url = format!("{}/busy/", server.uri());
        let response = client.get(&url).await.unwrap();
        assert_eq!(response.body, "finally");
    }

    #[tokio::test]
    async fn test_429_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wall/"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .mount(&server)
            .await;

        let mut client = fast_client();
        let url = format!("{}/wall/", server.uri());

        match client.get(&url).await {
            Err(DigestError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_429_without_retry_after_uses_base_delay() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quiet/"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/quiet/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        // base delay of zero keeps the exponential arm instantaneous
        let mut client = fast_client();
        let url = format!("{}/quiet/", server.uri());
        let response = client.get(&url).await.unwrap();
        assert_eq!(response.body, "ok");
    }
}
