//! User aggregate.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::events::Entity;

/// Helpdesk user (agent or requester).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

impl User {
    /// `"first last"`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Entity for User {
    const TYPE_NAME: &'static str = "users";

    fn entity_id(&self) -> String {
        self.id.to_string()
    }
}

/// Repository of record for users. Deleted users are not found.
#[async_trait]
pub trait UserRepository: Send + Sync + fmt::Debug {
    /// Loads a live user.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if the user does not exist or was
    /// deleted.
    async fn find(&self, id: u64) -> Result<User, DomainError>;

    /// Creates a user.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Repository`] on storage failure.
    async fn create(&self, first_name: &str, last_name: &str) -> Result<User, DomainError>;

    /// Soft-deletes a user and returns it with `deleted_at` set.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if the user does not exist.
    async fn delete(&self, id: u64) -> Result<User, DomainError>;
}
