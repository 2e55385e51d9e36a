//! Bounded in-memory backing store built on Moka.

use std::time::Duration;

use moka::sync::Cache as MokaCache;

use super::driver::{CacheDriver, CachedValue};
use crate::error::CacheError;

/// Capacity and expiry settings for [`MokaStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of entries before eviction kicks in.
    pub max_capacity: u64,

    /// Time-to-live for entries.
    pub ttl: Option<Duration>,

    /// Time-to-idle for entries.
    pub tti: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl: None,
            tti: None,
        }
    }
}

impl StoreConfig {
    /// Create a config with the given max capacity.
    #[must_use]
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            max_capacity,
            ..Default::default()
        }
    }

    /// Set time-to-live for entries.
    #[must_use]
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.ttl = Some(duration);
        self
    }

    /// Set time-to-idle for entries.
    #[must_use]
    pub fn tti(mut self, duration: Duration) -> Self {
        self.tti = Some(duration);
        self
    }
}

/// Process-wide backing store shared by every [`super::Cache`].
///
/// Moka evicts by a TinyLFU policy once `max_capacity` is reached, so a
/// `set` may be dropped silently under pressure.
#[derive(Clone)]
pub struct MokaStore {
    inner: MokaCache<String, CachedValue>,
}

impl MokaStore {
    /// Builds a store from `config`.
    #[must_use]
    pub fn new(config: &StoreConfig) -> Self {
        let mut builder = MokaCache::builder().max_capacity(config.max_capacity);
        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }
        if let Some(tti) = config.tti {
            builder = builder.time_to_idle(tti);
        }
        tracing::debug!(max_capacity = config.max_capacity, "cache store initialized");
        Self {
            inner: builder.build(),
        }
    }

    /// Approximate number of entries.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl std::fmt::Debug for MokaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaStore")
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

impl Default for MokaStore {
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}

impl CacheDriver for MokaStore {
    fn get(&self, key: &str) -> Result<CachedValue, CacheError> {
        self.inner.get(key).ok_or(CacheError::NotFound)
    }

    fn set(&self, key: &str, value: CachedValue) -> Result<(), CacheError> {
        self.inner.insert(key.to_string(), value);
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<(), CacheError> {
        self.inner.invalidate(key);
        Ok(())
    }
}
