//! DNS domains a tenant receives mail for.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::events::Entity;

/// A mail domain owned by a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsDomain {
    /// Domain identifier.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant: Uuid,
    /// Fully qualified name, e.g. `example.com`.
    pub name: String,
}

impl Entity for DnsDomain {
    const TYPE_NAME: &'static str = "dnsdomains";

    fn entity_id(&self) -> String {
        self.id.to_string()
    }
}

/// Repository of record for DNS domains.
#[async_trait]
pub trait DnsDomainRepository: Send + Sync + fmt::Debug {
    /// Every domain belonging to `tenant`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Repository`] on storage failure.
    async fn get_domains(&self, tenant: Uuid) -> Result<Vec<DnsDomain>, DomainError>;

    /// Loads one domain.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if it does not exist.
    async fn find(&self, id: Uuid) -> Result<DnsDomain, DomainError>;

    /// Stores a new domain.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidRequest`] if `domain.tenant` differs
    /// from `tenant` or the name is already registered.
    async fn create_domain(&self, tenant: Uuid, domain: DnsDomain) -> Result<DnsDomain, DomainError>;

    /// Removes a domain and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if `tenant` owns no such domain.
    async fn delete_domain(&self, tenant: Uuid, id: Uuid) -> Result<DnsDomain, DomainError>;

    /// Names of every registered domain, across tenants.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Repository`] on storage failure.
    async fn authoritative_names(&self) -> Result<Vec<String>, DomainError>;
}
