//! Response cache for computed graph payloads.
//!
//! Values are opaque JSON strings stored under `graph_data:<graph-type>`
//! keys with a TTL. Two backends share one interface:
//!
//! | Backend | When |
//! |---------|------|
//! | In-memory TTL map | no `DRAGONFLY_URL` configured |
//! | `Dragonfly`/Redis via `fred` | `DRAGONFLY_URL` set |
//!
//! Every round trip is bounded by a deadline so a slow cache can never stall
//! a request; the caller treats a timed-out read as a miss.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fred::prelude::*;
use fred::types::Expiration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::StoreError;

/// A cached value and the instant it stops being valid.
type Entry = (String, Instant);

#[derive(Clone)]
enum Backend {
    Memory(Arc<RwLock<HashMap<String, Entry>>>),
    Dragonfly(Client),
}

/// Key/value cache with per-entry TTL and a per-operation deadline.
#[derive(Clone)]
pub struct ResponseCache {
    backend: Backend,
    timeout: Duration,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match self.backend {
            Backend::Memory(_) => "memory",
            Backend::Dragonfly(_) => "dragonfly",
        };
        f.debug_struct("ResponseCache")
            .field("backend", &backend)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ResponseCache {
    /// An in-process cache.
    pub fn memory(timeout: Duration) -> Self {
        Self {
            backend: Backend::Memory(Arc::new(RwLock::new(HashMap::new()))),
            timeout,
        }
    }

    /// Connect to `Dragonfly` at the given URL (`redis://host:port[/db]`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed,
    /// [`StoreError::Dragonfly`] if the connection fails and
    /// [`StoreError::CacheTimeout`] if it does not complete in time.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::Config(format!("invalid Dragonfly URL: {e}")))?;
        let client = Builder::from_config(config).build()?;
        bounded(timeout, async {
            client.init().await?;
            Ok::<_, StoreError>(())
        })
        .await?;

        info!("connected to Dragonfly");
        Ok(Self {
            backend: Backend::Dragonfly(client),
            timeout,
        })
    }

    /// Read a value. Expired and missing keys are `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails or the deadline passes.
    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        bounded(self.timeout, async {
            match &self.backend {
                Backend::Memory(map) => Ok::<_, StoreError>(
                    map.read()
                        .await
                        .get(key)
                        .filter(|(_, expires)| *expires > Instant::now())
                        .map(|(value, _)| value.clone()),
                ),
                Backend::Dragonfly(client) => {
                    let value: Option<String> = client.get(key).await?;
                    Ok(value)
                }
            }
        })
        .await
    }

    /// Store a value that expires after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails or the deadline passes.
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        bounded(self.timeout, async {
            match &self.backend {
                Backend::Memory(map) => {
                    let expires = Instant::now()
                        .checked_add(ttl)
                        .unwrap_or_else(far_future);
                    map.write()
                        .await
                        .insert(key.to_owned(), (value.to_owned(), expires));
                }
                Backend::Dragonfly(client) => {
                    let seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);
                    let _: () = client
                        .set(key, value, Some(Expiration::EX(seconds)), None, false)
                        .await?;
                }
            }
            debug!(key, ttl_secs = ttl.as_secs(), "cache entry stored");
            Ok::<_, StoreError>(())
        })
        .await
    }

    /// Remove the given keys. Missing keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails or the deadline passes.
    pub async fn invalidate(&self, keys: &[String]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        bounded(self.timeout, async {
            match &self.backend {
                Backend::Memory(map) => {
                    let mut map = map.write().await;
                    for key in keys {
                        map.remove(key);
                    }
                }
                Backend::Dragonfly(client) => {
                    let _: u32 = client.del(keys.to_vec()).await?;
                }
            }
            debug!(keys = keys.len(), "cache entries invalidated");
            Ok::<_, StoreError>(())
        })
        .await
    }
}

/// Thirty years, the stand-in for an expiry `Instant` cannot represent.
const FAR_FUTURE: Duration = Duration::from_secs(946_080_000);

fn far_future() -> Instant {
    Instant::now()
        .checked_add(FAR_FUTURE)
        .unwrap_or_else(Instant::now)
}

async fn bounded<T>(
    timeout: Duration,
    op: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    tokio::time::timeout(timeout, op).await?
}
