//! Subscription index keyed by literal-or-wildcard topic segments.
//!
//! Stored as three nested maps (`entity -> id -> kind -> callbacks`).
//! Lookup probes the at most eight combinations of "literal or wildcard"
//! at each position, so a concrete topic finds every registered pattern
//! that matches it, not only the most specific one.

use std::collections::HashMap;
use std::fmt;

use super::driver::RawCallback;
use super::topic::{Topic, WILDCARD};

type KindMap = HashMap<String, Vec<RawCallback>>;
type IdMap = HashMap<String, KindMap>;

/// Index from topic patterns to callbacks.
///
/// Not synchronized; the owning driver wraps it in a reader-writer lock.
#[derive(Default)]
pub struct SubscriptionRegistry {
    subs: HashMap<String, IdMap>,
    count: usize,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` under the three segments of `pattern`.
    pub fn insert(&mut self, pattern: &Topic, callback: RawCallback) {
        self.subs
            .entry(pattern.entity().to_string())
            .or_default()
            .entry(pattern.id().to_string())
            .or_default()
            .entry(pattern.kind().to_string())
            .or_default()
            .push(callback);
        self.count = self.count.saturating_add(1);
    }

    /// Returns every callback whose pattern matches `topic`.
    ///
    /// Each registration appears at most once. Order across patterns is
    /// unspecified.
    #[must_use]
    pub fn matches(&self, topic: &Topic) -> Vec<RawCallback> {
        let mut found = Vec::new();
        for entity in candidates(topic.entity()) {
            let Some(ids) = self.subs.get(entity) else {
                continue;
            };
            for id in candidates(topic.id()) {
                let Some(kinds) = ids.get(id) else {
                    continue;
                };
                for kind in candidates(topic.kind()) {
                    if let Some(callbacks) = kinds.get(kind) {
                        found.extend(callbacks.iter().cloned());
                    }
                }
            }
        }
        found
    }

    /// Total number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("subscriptions", &self.count)
            .finish()
    }
}

/// The segment itself and the wildcard, without repeating the wildcard.
fn candidates(segment: &str) -> impl Iterator<Item = &str> {
    let wildcard = (segment != WILDCARD).then_some(WILDCARD);
    std::iter::once(segment).chain(wildcard)
}
