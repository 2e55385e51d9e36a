//! Three-segment hierarchical topics and event kinds.
//!
//! A [`Topic`] is `(entity, id, kind)`. On the wire it is the three
//! segments joined by the bus separator, e.g. `tickets:42:update`. Any
//! segment may be the [`WILDCARD`] when subscribing; published topics are
//! always fully concrete.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EventError;

/// Segment value matching any concrete value at its position.
pub const WILDCARD: &str = "*";

/// Separator used when none is configured.
pub const DEFAULT_SEPARATOR: &str = ":";

/// Separators a bus may be configured with. None of them can occur in an
/// entity type name, a numeric id or a UUID.
pub const SEPARATORS: [&str; 4] = [":", ".", "/", "|"];

/// Checks that `separator` is one of [`SEPARATORS`].
///
/// # Errors
///
/// Returns [`EventError::InvalidSeparator`] for any other value.
pub fn validate_separator(separator: &str) -> Result<(), EventError> {
    if SEPARATORS.contains(&separator) {
        Ok(())
    } else {
        Err(EventError::InvalidSeparator(separator.to_string()))
    }
}

/// Lifecycle event kind carried in the third topic segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An aggregate was created.
    Create,
    /// An aggregate was updated.
    Update,
    /// An aggregate was deleted.
    Delete,
}

impl EventKind {
    /// Every lifecycle kind, in declaration order.
    pub const ALL: [Self; 3] = [Self::Create, Self::Update, Self::Delete];

    /// Returns the topic segment for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(EventError::UnknownKind(other.to_string())),
        }
    }
}

/// Immutable `(entity, id, kind)` address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    entity: String,
    id: String,
    kind: String,
}

impl Topic {
    /// Builds a topic from its three segments.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidTopic`] if any segment is empty.
    pub fn new(
        entity: impl Into<String>,
        id: impl Into<String>,
        kind: impl Into<String>,
    ) -> Result<Self, EventError> {
        let topic = Self {
            entity: entity.into(),
            id: id.into(),
            kind: kind.into(),
        };
        if topic.entity.is_empty() || topic.id.is_empty() || topic.kind.is_empty() {
            return Err(EventError::InvalidTopic(format!(
                "({}, {}, {})",
                topic.entity, topic.id, topic.kind
            )));
        }
        Ok(topic)
    }

    /// Splits `subject` on `separator` into a topic.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidTopic`] unless the subject yields
    /// exactly three non-empty segments.
    pub fn parse(subject: &str, separator: &str) -> Result<Self, EventError> {
        let invalid = || EventError::InvalidTopic(subject.to_string());
        if separator.is_empty() {
            return Err(invalid());
        }
        let mut parts = subject.split(separator);
        let (Some(entity), Some(id), Some(kind), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        Self::new(entity, id, kind).map_err(|_| invalid())
    }

    /// Entity type segment.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Instance id segment.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Event kind segment.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns `true` if no segment is the wildcard.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.segments().iter().all(|s| *s != WILDCARD)
    }

    /// Returns the three segments in order.
    #[must_use]
    pub fn segments(&self) -> [&str; 3] {
        [&self.entity, &self.id, &self.kind]
    }

    /// Joins the segments with `separator`.
    #[must_use]
    pub fn subject(&self, separator: &str) -> String {
        self.segments().join(separator)
    }
}
