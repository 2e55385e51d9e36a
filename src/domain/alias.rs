//! Mail alias aggregate: an address `user@domain` owned by a tenant.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::events::Entity;

/// Inbound mail alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    /// Alias identifier.
    pub id: u64,
    /// Owning tenant.
    pub tenant: Uuid,
    /// Local part of the address.
    pub user: String,
    /// Domain part of the address.
    pub domain: String,
    /// Soft-delete timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Alias {
    /// Full address, `user@domain`.
    #[must_use]
    pub fn email(&self) -> String {
        format!("{}@{}", self.user, self.domain)
    }
}

impl Entity for Alias {
    const TYPE_NAME: &'static str = "aliases";

    fn entity_id(&self) -> String {
        self.id.to_string()
    }
}

/// Lookup criteria. Either `id`, or both `user` and `domain`, must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindAliasParameters {
    /// Alias identifier.
    pub id: Option<u64>,
    /// Local part.
    pub user: Option<String>,
    /// Domain part.
    pub domain: Option<String>,
}

/// Repository of record for aliases.
#[async_trait]
pub trait AliasRepository: Send + Sync + fmt::Debug {
    /// Finds a live alias belonging to `tenant`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] when nothing matches.
    async fn find(&self, tenant: Uuid, params: &FindAliasParameters) -> Result<Alias, DomainError>;

    /// Finds a live alias by id regardless of tenant.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] when the alias does not exist or
    /// was deleted.
    async fn find_by_id(&self, id: u64) -> Result<Alias, DomainError>;

    /// Creates an alias.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidRequest`] if the address is taken.
    async fn create(&self, tenant: Uuid, user: &str, domain: &str) -> Result<Alias, DomainError>;

    /// Soft-deletes an alias and returns it with `deleted_at` set.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if `tenant` owns no such alias.
    async fn delete(&self, tenant: Uuid, id: u64) -> Result<Alias, DomainError>;

    /// Addresses of every live alias on `domain`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Repository`] on storage failure.
    async fn addresses_for_domain(&self, domain: &str) -> Result<Vec<String>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_joins_user_and_domain() {
        let alias = Alias {
            id: 1,
            tenant: Uuid::new_v4(),
            user: "bob".to_string(),
            domain: "test.com".to_string(),
            deleted_at: None,
        };
        assert_eq!(alias.email(), "bob@test.com");
        assert_eq!(alias.entity_id(), "1");
    }
}
