//! Display-name resolution with a time-bounded cache.
//!
//! Handles resolve through the external identity provider at most once
//! per expiry window; entries are refreshed lazily on lookup miss and
//! never proactively invalidated. Failed lookups are not cached, so a
//! provider outage is retried on the next request. Two simultaneous
//! misses may both hit the provider; the second insert wins and both
//! callers get a usable name.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::providers::{IdentityProvider, ProviderError};

/// Soft TTL after which a cached name is considered stale.
const DEFAULT_TTL_HOURS: i64 = 24;
/// Hard window after which a cached name is discarded and re-fetched.
const HARD_EXPIRY_HOURS: i64 = 48;

#[derive(Clone, Debug)]
struct CachedName {
    name: String,
    cached_at: DateTime<Utc>,
}

/// Resolves user handles to display names, caching results in-process.
pub struct IdentityResolver {
    provider: Arc<dyn IdentityProvider>,
    cache: DashMap<String, CachedName>,
    ttl: Duration,
    hard_expiry: Duration,
}

impl IdentityResolver {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self::with_expiry(
            provider,
            Duration::hours(DEFAULT_TTL_HOURS),
            Duration::hours(HARD_EXPIRY_HOURS),
        )
    }

    /// Construct with explicit expiry windows. Exposed for tests.
    pub fn with_expiry(
        provider: Arc<dyn IdentityProvider>,
        ttl: Duration,
        hard_expiry: Duration,
    ) -> Self {
        Self {
            provider,
            cache: DashMap::new(),
            ttl,
            hard_expiry,
        }
    }

    /// Resolve `handle` to a display name, consulting the cache first.
    ///
    /// A provider failure is fatal for the current request only; the
    /// bridge cannot deliver an unattributable comment, but the service
    /// keeps running and the next request retries the lookup.
    pub async fn resolve(&self, handle: &str) -> Result<String, ProviderError> {
        if let Some(name) = self.cached(handle) {
            return Ok(name);
        }

        let name = self.provider.display_name(handle).await?;
        log::info!("resolved display name for {}: {}", handle, name);
        self.cache.insert(
            handle.to_string(),
            CachedName {
                name: name.clone(),
                cached_at: Utc::now(),
            },
        );
        Ok(name)
    }

    /// Return the cached name unless hard-expired, dropping the entry
    /// when it is. Entries past the soft TTL are still served; they are
    /// only flagged in the log.
    fn cached(&self, handle: &str) -> Option<String> {
        let hit = match self.cache.get(handle) {
            Some(entry) => {
                let age = Utc::now() - entry.cached_at;
                if age < self.hard_expiry {
                    let stale = age >= self.ttl;
                    log::info!(
                        "display name cache hit for {}: {}{}",
                        handle,
                        entry.name,
                        if stale { " (stale)" } else { "" }
                    );
                    Some(entry.name.clone())
                } else {
                    None
                }
            }
            None => return None,
        };

        if hit.is_none() {
            self.cache.remove(handle);
        }
        hit
    }

    /// Number of cached names. Diagnostics only.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
