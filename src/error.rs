//! Error types for the event bus, the cache layer and the domain services.
//!
//! Each concern has its own enum so callers can tell a malformed topic
//! from a cache miss from a repository failure. [`DomainError`] wraps the
//! other two and is what the services return.

/// Errors raised by topic parsing, subscription and dispatch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The subject does not split into exactly three non-empty segments,
    /// or a published subject contains a wildcard.
    #[error("not a valid event subject key: {0:?}")]
    InvalidTopic(String),

    /// The topic separator is not one of the id-safe separators.
    #[error("not a valid event separator: {0:?}")]
    InvalidSeparator(String),

    /// The event kind segment is not a known kind.
    #[error("unknown event kind: {0:?}")]
    UnknownKind(String),

    /// The bus was constructed outside a tokio runtime.
    #[error("event bus requires a running tokio runtime")]
    NoRuntime,

    /// The dispatch workers have stopped.
    #[error("event bus is closed")]
    Closed,
}

/// Errors raised by [`crate::cache::Cache`] and its backing stores.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The cache prefix is empty.
    #[error("not a valid cache prefix")]
    InvalidPrefix,

    /// The cache key is empty.
    #[error("not a valid cache key")]
    InvalidKey,

    /// The backing store has no entry for the key.
    #[error("key not found in cache")]
    NotFound,

    /// The stored value is not of the requested type.
    #[error("cached value is invalid")]
    ValueInvalid,
}

/// Error returned by the domain services and repositories.
///
/// # Error Code Ranges
///
/// | Range     | Category     |
/// |-----------|--------------|
/// | 1000–1999 | Validation   |
/// | 2000–2999 | Not Found    |
/// | 3000–3999 | Repository   |
/// | 4000–4999 | Event bus    |
/// | 5000–5999 | Cache        |
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// The requested aggregate does not exist (or has been deleted).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The repository of record failed.
    #[error("repository error: {0}")]
    Repository(String),

    /// Event bus failure.
    #[error("event bus error: {0}")]
    Event(#[from] EventError),

    /// Cache failure.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

impl DomainError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::NotFound(_) => 2001,
            Self::Repository(_) => 3001,
            Self::Event(EventError::InvalidTopic(_)) => 4001,
            Self::Event(EventError::InvalidSeparator(_)) => 4002,
            Self::Event(EventError::UnknownKind(_)) => 4003,
            Self::Event(EventError::NoRuntime) => 4004,
            Self::Event(EventError::Closed) => 4005,
            Self::Cache(CacheError::InvalidPrefix) => 5001,
            Self::Cache(CacheError::InvalidKey) => 5002,
            Self::Cache(CacheError::NotFound) => 5003,
            Self::Cache(CacheError::ValueInvalid) => 5004,
        }
    }

    /// Returns `true` for the not-found outcome.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
