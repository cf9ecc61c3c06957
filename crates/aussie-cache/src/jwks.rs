//! JWKS cache with write-TTL and thundering-herd fetch coalescing
//! (spec §4.1). Grounded on the teacher's `auth-cache::MultiLevelCache`
//! shape and generalized with the single-fetch-per-uri pattern from
//! `jwks-cache` (hack.ink) and
//! `other_examples/735b1727_parthspatel-glyph__libs-auth-src-jwks.rs.rs`.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::Instant;

#[derive(Debug, Error, Clone)]
pub enum CacheError {
    #[error("JWKS fetch failed for {uri}: {reason}")]
    JwksFetchError { uri: String, reason: String },
}

/// Abstraction over the remote fetch so tests can instrument/count calls
/// without a real network (spec §8 "JWKS coalescing" scenario).
#[async_trait::async_trait]
pub trait JwksFetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<JwkSet, CacheError>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(fetch_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .expect("failed to build JWKS http client");
        Self { client }
    }
}

#[async_trait::async_trait]
impl JwksFetcher for ReqwestFetcher {
    async fn fetch(&self, uri: &str) -> Result<JwkSet, CacheError> {
        let response = self
            .client
            .get(uri)
            .send()
            .await
            .map_err(|e| CacheError::JwksFetchError {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(CacheError::JwksFetchError {
                uri: uri.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| CacheError::JwksFetchError {
                uri: uri.to_string(),
                reason: format!("invalid JSON: {e}"),
            })
    }
}

struct CacheEntry {
    key_set: Arc<JwkSet>,
    expires_at: Instant,
}

type FetchResult = Result<Arc<JwkSet>, Arc<CacheError>>;

struct InFlight {
    tx: broadcast::Sender<FetchResult>,
}

pub struct JwksCache {
    entries: DashMap<String, CacheEntry>,
    in_flight: DashMap<String, InFlight>,
    fetcher: Arc<dyn JwksFetcher>,
    ttl: Duration,
    max_entries: usize,
}

impl JwksCache {
    pub fn new(fetcher: Arc<dyn JwksFetcher>, ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            fetcher,
            ttl,
            max_entries,
        }
    }

    /// Returns the cached or freshly-fetched key set. On fetch failure,
    /// falls back to a stale cached entry if one exists.
    pub async fn get_key_set(&self, uri: &str) -> Result<Arc<JwkSet>, CacheError> {
        if let Some(entry) = self.entries.get(uri) {
            if entry.expires_at > Instant::now() {
                return Ok(entry.key_set.clone());
            }
        }
        self.fetch_coalesced(uri).await
    }

    pub async fn get_key(&self, uri: &str, kid: Option<&str>) -> Option<Jwk> {
        let key_set = self.get_key_set(uri).await.ok()?;
        match kid {
            Some(kid) => key_set
                .keys
                .iter()
                .find(|k| k.common.key_id.as_deref() == Some(kid))
                .cloned(),
            None if key_set.keys.len() == 1 => key_set.keys.first().cloned(),
            None => None,
        }
    }

    pub async fn refresh(&self, uri: &str) -> Result<Arc<JwkSet>, CacheError> {
        self.fetch_coalesced(uri).await
    }

    pub fn invalidate(&self, uri: &str) {
        self.entries.remove(uri);
    }

    async fn fetch_coalesced(&self, uri: &str) -> Result<Arc<JwkSet>, CacheError> {
        loop {
            let (mut rx, became_fetcher) = match self.in_flight.entry(uri.to_string()) {
                Entry::Occupied(existing) => (existing.get().tx.subscribe(), false),
                Entry::Vacant(vacant) => {
                    let (tx, rx) = broadcast::channel(1);
                    vacant.insert(InFlight { tx });
                    (rx, true)
                }
            };

            if became_fetcher {
                let result = self.fetcher.fetch(uri).await;
                let shared: FetchResult = match &result {
                    Ok(key_set) => Ok(Arc::new(key_set.clone())),
                    Err(e) => Err(Arc::new(e.clone())),
                };

                match &shared {
                    Ok(key_set) => {
                        self.evict_if_full();
                        self.entries.insert(
                            uri.to_string(),
                            CacheEntry {
                                key_set: key_set.clone(),
                                expires_at: Instant::now() + self.ttl,
                            },
                        );
                    }
                    Err(_) => {
                        tracing::warn!(uri, "JWKS fetch failed");
                    }
                }

                if let Some((_, in_flight)) = self.in_flight.remove(uri) {
                    let _ = in_flight.tx.send(shared.clone());
                }

                return match shared {
                    Ok(key_set) => Ok(key_set),
                    Err(e) => self
                        .entries
                        .get(uri)
                        .map(|entry| entry.key_set.clone())
                        .ok_or_else(|| (*e).clone()),
                };
            }

            match rx.recv().await {
                Ok(Ok(key_set)) => return Ok(key_set),
                Ok(Err(e)) => {
                    return self
                        .entries
                        .get(uri)
                        .map(|entry| entry.key_set.clone())
                        .ok_or_else(|| (*e).clone())
                }
                Err(broadcast::error::RecvError::Closed) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    }

    fn evict_if_full(&self) {
        if self.entries.len() < self.max_entries {
            return;
        }
        // Simple oldest-expiry eviction; the cache is small (one entry
        // per configured provider) so a linear scan is fine.
        if let Some(oldest) = self
            .entries
            .iter()
            .min_by_key(|e| e.expires_at)
            .map(|e| e.key().clone())
        {
            self.entries.remove(&oldest);
        }
    }
}
