//! Raw string-keyed backing store contract.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::CacheError;

/// Type-erased value held by a backing store.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// Key/value store underneath [`super::Cache`].
///
/// Implementations must be safe for concurrent use and may drop entries
/// on their own (capacity or age based). A store is an optimization only,
/// never a source of truth.
pub trait CacheDriver: Send + Sync + fmt::Debug {
    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotFound`] when there is no entry.
    fn get(&self, key: &str) -> Result<CachedValue, CacheError>;

    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Implementation specific; the in-memory store never fails.
    fn set(&self, key: &str, value: CachedValue) -> Result<(), CacheError>;

    /// Removes the entry under `key`, if any.
    ///
    /// # Errors
    ///
    /// Implementation specific; the in-memory store never fails.
    fn forget(&self, key: &str) -> Result<(), CacheError>;
}
