//! On-disk response cache keyed by exact URL string.
//!
//! Every successful (status 200) response is snapshotted here so repeated
//! runs never re-fetch a page the site already served. The cache is one JSON
//! file: a mapping from URL to [`CachedResponse`]. Keys are the URL string
//! exactly as requested, with no normalization, so two URLs differing only by a
//! trailing slash or query order are distinct entries.
//!
//! A missing cache file is a cold start, not an error; the pipeline saves
//! the cache on every exit path so a failed run still keeps what it fetched.

use crate::errors::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Snapshot of one fetched HTTP response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedResponse {
    /// HTTP status code (always 200 for entries put by the fetcher).
    pub status: u16,
    /// Response headers, lowercased names.
    pub headers: HashMap<String, String>,
    /// Response body as text.
    pub body: String,
    /// RFC 3339 timestamp of when the response was fetched.
    pub fetched_at: String,
}

impl CachedResponse {
    pub fn new(status: u16, headers: HashMap<String, String>, body: String) -> Self {
        Self {
            status,
            headers,
            body,
            fetched_at: Utc::now().to_rfc3339(),
        }
    }
}

/// In-memory URL → response mapping with JSON persistence.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: HashMap<String, CachedResponse>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached response for `url`, if one was ever stored.
    pub fn get(&self, url: &str) -> Option<&CachedResponse> {
        self.entries.get(url)
    }

    /// Store a response under the exact URL string it was fetched from.
    pub fn put(&mut self, url: &str, response: CachedResponse) {
        self.entries.insert(url.to_string(), response);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Populate the cache from `path`. A missing file leaves the cache
    /// empty and is not an error; a present-but-unreadable file is.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No cache file found; starting with an empty cache");
            return Ok(());
        }

        let raw = std::fs::read_to_string(path)?;
        self.entries = serde_json::from_str(&raw)?;
        info!(entries = self.entries.len(), "Loaded response cache");
        Ok(())
    }

    /// Serialize the full cache to `path`, replacing any previous file.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string(&self.entries)?;
        std::fs::write(path.as_ref(), json)?;
        debug!(entries = self.entries.len(), "Saved response cache");
        Ok(())
    }
}
