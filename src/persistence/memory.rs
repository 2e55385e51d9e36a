//! In-memory repositories.
//!
//! Each repository keeps its records in a `tokio::sync::RwLock<HashMap>`;
//! reads share the lock and writes are serialized. Numeric ids are
//! assigned as the current maximum plus one.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    Alias, AliasRepository, DnsDomain, DnsDomainRepository, FindAliasParameters, Ticket,
    TicketRepository, TicketStatus, TicketTransition, TicketUpdateParameters, User,
    UserRepository,
};
use crate::error::DomainError;

fn next_id<V>(map: &HashMap<u64, V>) -> u64 {
    map.keys().max().map_or(1, |max| max + 1)
}

/// Ticket store backed by a map of id to aggregate.
#[derive(Debug, Default)]
pub struct InMemoryTicketRepository {
    tickets: RwLock<HashMap<u64, Ticket>>,
}

impl InMemoryTicketRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tickets.
    pub async fn len(&self) -> usize {
        self.tickets.read().await.len()
    }

    /// Returns `true` if no tickets are stored.
    pub async fn is_empty(&self) -> bool {
        self.tickets.read().await.is_empty()
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn find(&self, id: u64) -> Result<Ticket, DomainError> {
        self.tickets
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("ticket {id}")))
    }

    async fn open(&self, description: &str) -> Result<Ticket, DomainError> {
        let mut map = self.tickets.write().await;
        let ticket = Ticket {
            id: next_id(&map),
            transitions: vec![TicketTransition {
                timestamp: Utc::now(),
                status: TicketStatus::Open,
                owner_id: None,
                description: Some(description.to_string()),
            }],
        };
        map.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn update(&self, id: u64, params: TicketUpdateParameters) -> Result<Ticket, DomainError> {
        let mut map = self.tickets.write().await;
        let ticket = map
            .get_mut(&id)
            .ok_or_else(|| DomainError::NotFound(format!("ticket {id}")))?;

        // Transitions must be strictly ordered for `Ticket::meta` to pick
        // the newest one.
        let now = Utc::now();
        let timestamp = match ticket.transitions.iter().map(|t| t.timestamp).max() {
            Some(last) if last >= now => last + Duration::nanoseconds(1),
            _ => now,
        };
        ticket.transitions.push(TicketTransition {
            timestamp,
            status: params.status,
            owner_id: params.owner_id,
            description: params.description,
        });
        Ok(ticket.clone())
    }
}

/// User store. Deleted users stay in the map with `deleted_at` set.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<u64, User>>,
}

impl InMemoryUserRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find(&self, id: u64) -> Result<User, DomainError> {
        self.users
            .read()
            .await
            .get(&id)
            .filter(|user| user.deleted_at.is_none())
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("user {id}")))
    }

    async fn create(&self, first_name: &str, last_name: &str) -> Result<User, DomainError> {
        let mut map = self.users.write().await;
        let now = Utc::now();
        let user = User {
            id: next_id(&map),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };
        map.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: u64) -> Result<User, DomainError> {
        let mut map = self.users.write().await;
        let user = map
            .get_mut(&id)
            .filter(|user| user.deleted_at.is_none())
            .ok_or_else(|| DomainError::NotFound(format!("user {id}")))?;
        let now = Utc::now();
        user.deleted_at = Some(now);
        user.updated_at = now;
        Ok(user.clone())
    }
}

/// Alias store. Deleted aliases stay in the map with `deleted_at` set.
#[derive(Debug, Default)]
pub struct InMemoryAliasRepository {
    aliases: RwLock<HashMap<u64, Alias>>,
}

impl InMemoryAliasRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AliasRepository for InMemoryAliasRepository {
    async fn find(&self, tenant: Uuid, params: &FindAliasParameters) -> Result<Alias, DomainError> {
        let map = self.aliases.read().await;
        map.values()
            .filter(|alias| alias.tenant == tenant && alias.deleted_at.is_none())
            .find(|alias| {
                params.id.is_none_or(|id| alias.id == id)
                    && params.user.as_ref().is_none_or(|user| &alias.user == user)
                    && params.domain.as_ref().is_none_or(|domain| &alias.domain == domain)
            })
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("alias {params:?}")))
    }

    async fn find_by_id(&self, id: u64) -> Result<Alias, DomainError> {
        self.aliases
            .read()
            .await
            .get(&id)
            .filter(|alias| alias.deleted_at.is_none())
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("alias {id}")))
    }

    async fn create(&self, tenant: Uuid, user: &str, domain: &str) -> Result<Alias, DomainError> {
        let mut map = self.aliases.write().await;
        let taken = map
            .values()
            .any(|alias| alias.deleted_at.is_none() && alias.user == user && alias.domain == domain);
        if taken {
            return Err(DomainError::InvalidRequest(format!(
                "alias {user}@{domain} already exists"
            )));
        }
        let alias = Alias {
            id: next_id(&map),
            tenant,
            user: user.to_string(),
            domain: domain.to_string(),
            deleted_at: None,
        };
        map.insert(alias.id, alias.clone());
        Ok(alias)
    }

    async fn delete(&self, tenant: Uuid, id: u64) -> Result<Alias, DomainError> {
        let mut map = self.aliases.write().await;
        let alias = map
            .get_mut(&id)
            .filter(|alias| alias.tenant == tenant && alias.deleted_at.is_none())
            .ok_or_else(|| DomainError::NotFound(format!("alias {id}")))?;
        alias.deleted_at = Some(Utc::now());
        Ok(alias.clone())
    }

    async fn addresses_for_domain(&self, domain: &str) -> Result<Vec<String>, DomainError> {
        let map = self.aliases.read().await;
        let mut addresses: Vec<String> = map
            .values()
            .filter(|alias| alias.deleted_at.is_none() && alias.domain == domain)
            .map(Alias::email)
            .collect();
        addresses.sort();
        Ok(addresses)
    }
}

/// DNS domain store keyed by domain id.
#[derive(Debug, Default)]
pub struct InMemoryDnsDomainRepository {
    domains: RwLock<HashMap<Uuid, DnsDomain>>,
}

impl InMemoryDnsDomainRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DnsDomainRepository for InMemoryDnsDomainRepository {
    async fn get_domains(&self, tenant: Uuid) -> Result<Vec<DnsDomain>, DomainError> {
        let map = self.domains.read().await;
        let mut domains: Vec<DnsDomain> = map
            .values()
            .filter(|domain| domain.tenant == tenant)
            .cloned()
            .collect();
        domains.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(domains)
    }

    async fn find(&self, id: Uuid) -> Result<DnsDomain, DomainError> {
        self.domains
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("dns domain {id}")))
    }

    async fn create_domain(&self, tenant: Uuid, domain: DnsDomain) -> Result<DnsDomain, DomainError> {
        if domain.tenant != tenant {
            return Err(DomainError::InvalidRequest(format!(
                "domain {} belongs to another tenant",
                domain.name
            )));
        }
        let mut map = self.domains.write().await;
        if map.values().any(|existing| existing.name == domain.name) {
            return Err(DomainError::InvalidRequest(format!(
                "domain {} already registered",
                domain.name
            )));
        }
        map.insert(domain.id, domain.clone());
        Ok(domain)
    }

    async fn delete_domain(&self, tenant: Uuid, id: Uuid) -> Result<DnsDomain, DomainError> {
        let mut map = self.domains.write().await;
        if map.get(&id).is_none_or(|domain| domain.tenant != tenant) {
            return Err(DomainError::NotFound(format!("dns domain {id}")));
        }
        map.remove(&id)
            .ok_or_else(|| DomainError::NotFound(format!("dns domain {id}")))
    }

    async fn authoritative_names(&self) -> Result<Vec<String>, DomainError> {
        let map = self.domains.read().await;
        let mut names: Vec<String> = map.values().map(|domain| domain.name.clone()).collect();
        names.sort();
        Ok(names)
    }
}
