//! Refresh-or-evict cache coherence driven by lifecycle events.
//!
//! Each service subscribes its `observe_*_event` entry point to
//! create/update/delete for every instance of its aggregate and forwards to
//! a [`CoherenceObserver<T>`]. The observer re-reads the instance from the
//! repository of record: a successful read overwrites the cache entry, a
//! failed read (typically a deletion) evicts it. The cache is only ever
//! filled from the repository.
//!
//! Events are delivered without ordering guarantees, so after a burst of
//! writes the cache may briefly hold an older (but once valid) value.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::cache::Cache;
use crate::error::DomainError;
use crate::events::{Entity, EventKind};

/// Loads the current value of an aggregate by its entity id.
pub type Loader<T> = Arc<dyn Fn(String) -> BoxFuture<'static, Result<T, DomainError>> + Send + Sync>;

/// Keeps `Cache<T>` entries in step with the repository of record.
pub struct CoherenceObserver<T> {
    cache: Cache<T>,
    loader: Loader<T>,
}

impl<T: Entity> CoherenceObserver<T> {
    /// Creates an observer writing into `cache` with values from `loader`.
    #[must_use]
    pub fn new(cache: Cache<T>, loader: Loader<T>) -> Self {
        Self { cache, loader }
    }

    /// Handles one event for `value`.
    pub async fn observe(&self, kind: EventKind, value: &T) {
        let id = value.entity_id();
        let prefix = self.cache.prefix();
        match (self.loader)(id.clone()).await {
            Ok(current) => {
                if let Err(error) = self.cache.set(&id, current) {
                    tracing::warn!(%prefix, %id, %kind, %error, "cache refresh failed");
                }
            }
            Err(reason) => {
                if reason.is_not_found() {
                    tracing::debug!(%prefix, %id, %kind, "evicting cache entry");
                } else {
                    tracing::warn!(%prefix, %id, %kind, %reason, "reload failed, evicting cache entry");
                }
                if let Err(error) = self.cache.forget(&id) {
                    tracing::warn!(%prefix, %id, %kind, %error, "cache eviction failed");
                }
            }
        }
    }

    /// The cache this observer maintains.
    #[must_use]
    pub fn cache(&self) -> &Cache<T> {
        &self.cache
    }
}

impl<T: Entity> fmt::Debug for CoherenceObserver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoherenceObserver")
            .field("entity", &T::TYPE_NAME)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
