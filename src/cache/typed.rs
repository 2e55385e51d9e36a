//! Prefixed, typed view over a shared [`CacheDriver`].
//!
//! Several `Cache<T>` instances with different `T` can share one store:
//! each writes under `prefix.key`, and a read that finds a value of the
//! wrong type reports [`CacheError::ValueInvalid`] rather than a miss.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::driver::{CacheDriver, CachedValue};
use crate::error::CacheError;

/// Joins the cache prefix and the caller's key.
pub const KEY_SEPARATOR: &str = ".";

/// Typed cache handle.
pub struct Cache<T> {
    prefix: String,
    driver: Arc<dyn CacheDriver>,
    _value: PhantomData<fn() -> T>,
}

impl<T: Clone + Send + Sync + 'static> Cache<T> {
    /// Creates a cache writing under `prefix` in `driver`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidPrefix`] if `prefix` is empty.
    pub fn new(prefix: impl Into<String>, driver: Arc<dyn CacheDriver>) -> Result<Self, CacheError> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(CacheError::InvalidPrefix);
        }
        Ok(Self {
            prefix,
            driver,
            _value: PhantomData,
        })
    }

    /// Prefix under which this cache stores its entries.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Stores `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidKey`] if `key` is empty, or the store's
    /// own error.
    pub fn set(&self, key: &str, value: T) -> Result<(), CacheError> {
        let key = self.store_key(key)?;
        let value: CachedValue = Arc::new(value);
        self.driver.set(&key, value)
    }

    /// Removes the entry under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidKey`] if `key` is empty, or the store's
    /// own error.
    pub fn forget(&self, key: &str) -> Result<(), CacheError> {
        let key = self.store_key(key)?;
        self.driver.forget(&key)
    }

    /// Reads the entry under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidKey`] for an empty key,
    /// [`CacheError::NotFound`] on a miss and [`CacheError::ValueInvalid`]
    /// when the stored value is not a `T`.
    pub fn get(&self, key: &str) -> Result<T, CacheError> {
        let key = self.store_key(key)?;
        let value = self.driver.get(&key)?;
        value
            .downcast_ref::<T>()
            .cloned()
            .ok_or(CacheError::ValueInvalid)
    }

    fn store_key(&self, key: &str) -> Result<String, CacheError> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey);
        }
        Ok(format!("{}{KEY_SEPARATOR}{key}", self.prefix))
    }
}

impl<T> Clone for Cache<T> {
    fn clone(&self) -> Self {
        Self {
            prefix: self.prefix.clone(),
            driver: Arc::clone(&self.driver),
            _value: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Cache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("prefix", &self.prefix)
            .field("value_type", &std::any::type_name::<T>())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use tokio_test::assert_ok;

    use super::*;
    use crate::cache::MokaStore;

    /// Plain map store that counts every call reaching it.
    #[derive(Debug, Default)]
    struct RecordingStore {
        entries: Mutex<HashMap<String, CachedValue>>,
        calls: AtomicUsize,
    }

    impl RecordingStore {
        fn raw(&self, key: &str) -> Option<CachedValue> {
            self.entries.lock().get(key).cloned()
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CacheDriver for RecordingStore {
        fn get(&self, key: &str) -> Result<CachedValue, CacheError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.raw(key).ok_or(CacheError::NotFound)
        }

        fn set(&self, key: &str, value: CachedValue) -> Result<(), CacheError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entries.lock().insert(key.to_string(), value);
            Ok(())
        }

        fn forget(&self, key: &str) -> Result<(), CacheError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entries.lock().remove(key);
            Ok(())
        }
    }

    fn string_cache(store: &Arc<RecordingStore>) -> Cache<String> {
        let Ok(cache) = Cache::new("test", Arc::clone(store) as Arc<dyn CacheDriver>) else {
            panic!("valid prefix");
        };
        cache
    }

    #[test]
    fn empty_prefix_is_rejected() {
        let store: Arc<dyn CacheDriver> = Arc::new(MokaStore::default());
        let result = Cache::<String>::new("", store);
        assert_eq!(result.err().map(|e| e.to_string()), Some(CacheError::InvalidPrefix.to_string()));
    }

    #[test]
    fn empty_key_never_reaches_store() {
        let store = Arc::new(RecordingStore::default());
        let cache = string_cache(&store);

        assert_eq!(cache.set("", String::new()), Err(CacheError::InvalidKey));
        assert_eq!(cache.get(""), Err(CacheError::InvalidKey));
        assert_eq!(cache.forget(""), Err(CacheError::InvalidKey));
        assert_eq!(store.calls(), 0);
        assert!(store.entries.lock().is_empty());
    }

    #[test]
    fn set_writes_prefixed_key() {
        let store = Arc::new(RecordingStore::default());
        let cache = string_cache(&store);

        assert_ok!(cache.set("1", "v".to_string()));
        let Some(raw) = store.raw("test.1") else {
            panic!("expected test.1 in store");
        };
        assert_eq!(raw.downcast_ref::<String>().map(String::as_str), Some("v"));
        assert_eq!(cache.get("1"), Ok("v".to_string()));
    }

    #[test]
    fn missing_key_is_not_found() {
        let store = Arc::new(RecordingStore::default());
        let cache = string_cache(&store);
        assert_eq!(cache.get("missing"), Err(CacheError::NotFound));
    }

    #[test]
    fn wrong_type_is_value_invalid() {
        let store = Arc::new(RecordingStore::default());
        let cache = string_cache(&store);
        assert_ok!(store.set("test.2", Arc::new(100_i32)));
        assert_eq!(cache.get("2"), Err(CacheError::ValueInvalid));
    }

    #[test]
    fn forget_then_get_is_not_found() {
        let store: Arc<dyn CacheDriver> = Arc::new(MokaStore::default());
        let Ok(cache) = Cache::<u64>::new("numbers", store) else {
            panic!("valid prefix");
        };
        assert_ok!(cache.set("a", 7));
        assert_eq!(cache.get("a"), Ok(7));
        assert_ok!(cache.forget("a"));
        assert_eq!(cache.get("a"), Err(CacheError::NotFound));
    }

    #[test]
    fn prefixes_isolate_shared_store() {
        let store: Arc<dyn CacheDriver> = Arc::new(MokaStore::default());
        let Ok(names) = Cache::<String>::new("names", Arc::clone(&store)) else {
            panic!("valid prefix");
        };
        let Ok(ages) = Cache::<u32>::new("ages", store) else {
            panic!("valid prefix");
        };
        assert_ok!(names.set("1", "alice".to_string()));
        assert_ok!(ages.set("1", 30));
        assert_eq!(names.get("1"), Ok("alice".to_string()));
        assert_eq!(ages.get("1"), Ok(30));
    }
}
