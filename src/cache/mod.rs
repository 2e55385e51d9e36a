//! Cache layer: typed prefixed caches over a shared backing store.
//!
//! - [`CacheDriver`] is the raw string-keyed store contract.
//! - [`MokaStore`] is the bounded in-memory store used in production.
//! - [`Cache<T>`] is the only handle domain services touch.

pub mod driver;
pub mod store;
pub mod typed;

pub use driver::{CacheDriver, CachedValue};
pub use store::{MokaStore, StoreConfig};
pub use typed::{Cache, KEY_SEPARATOR};
