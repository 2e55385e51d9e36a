//! Event system: topics, subscription registry, raw driver and typed bus.
//!
//! ```text
//! EventBus<T>  (typed: entity name + id + kind, payload T)
//!     │
//! EventBusDriver  (raw: subject string + type-erased payload)
//!     │
//! LocalEventBus ── SubscriptionRegistry (RwLock) ── worker pool
//! ```

pub mod driver;
pub mod local;
pub mod registry;
pub mod topic;
pub mod typed;

pub use driver::{EventBusDriver, Payload, RawCallback};
pub use local::{LocalBusConfig, LocalEventBus};
pub use registry::SubscriptionRegistry;
pub use topic::{DEFAULT_SEPARATOR, EventKind, SEPARATORS, Topic, WILDCARD, validate_separator};
pub use typed::{Entity, EventBus};
