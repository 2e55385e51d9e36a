//! Mail server view: which domains we accept mail for, which addresses
//! exist on each, and whether an inbound recipient is deliverable.
//!
//! Both lists are derived data spanning many aggregates, so instead of a
//! [`super::CoherenceObserver`] this service listens to alias and DNS
//! domain events directly and rebuilds the affected list from the
//! repositories.

use std::sync::Arc;

use crate::cache::{Cache, CacheDriver};
use crate::domain::{Alias, AliasRepository, DnsDomain, DnsDomainRepository};
use crate::error::DomainError;
use crate::events::{EventBus, EventBusDriver, EventKind};

/// Cache prefix of the authoritative domain list.
pub const DOMAIN_LIST_PREFIX: &str = "maildomains";
/// Cache key of the authoritative domain list.
pub const AUTHORITATIVE_KEY: &str = "authoritative";
/// Cache prefix of the per-domain address lists.
pub const ADDRESS_LIST_PREFIX: &str = "mailaliases";

/// Address and domain lookups for inbound mail.
#[derive(Debug, Clone)]
pub struct MailServerService {
    aliases: Arc<dyn AliasRepository>,
    domains: Arc<dyn DnsDomainRepository>,
    address_lists: Cache<Vec<String>>,
    domain_list: Cache<Vec<String>>,
}

impl MailServerService {
    /// Creates the service and subscribes it to alias and DNS domain events.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] if a cache or a subscription cannot be set
    /// up.
    pub fn new(
        aliases: Arc<dyn AliasRepository>,
        domains: Arc<dyn DnsDomainRepository>,
        event_driver: Arc<dyn EventBusDriver>,
        cache_driver: Arc<dyn CacheDriver>,
    ) -> Result<Self, DomainError> {
        let service = Self {
            aliases,
            domains,
            address_lists: Cache::new(ADDRESS_LIST_PREFIX, Arc::clone(&cache_driver))?,
            domain_list: Cache::new(DOMAIN_LIST_PREFIX, cache_driver)?,
        };

        let alias_events = EventBus::<Alias>::new(Arc::clone(&event_driver));
        let handle = service.clone();
        alias_events.subscribe(None, &EventKind::ALL, move |kind, alias: Alias| {
            let service = handle.clone();
            async move { service.observe_alias_event(kind, &alias).await }
        })?;

        let domain_events = EventBus::<DnsDomain>::new(event_driver);
        let handle = service.clone();
        domain_events.subscribe(None, &EventKind::ALL, move |kind, domain: DnsDomain| {
            let service = handle.clone();
            async move { service.observe_domain_event(kind, &domain).await }
        })?;

        Ok(service)
    }

    /// Addresses of every live alias on `domain`.
    ///
    /// # Errors
    ///
    /// Returns the repository error on a cache miss.
    pub async fn get_aliases(&self, domain: &str) -> Result<Vec<String>, DomainError> {
        if let Ok(addresses) = self.address_lists.get(domain) {
            return Ok(addresses);
        }
        self.refresh_aliases(domain).await
    }

    /// Names of every domain we are authoritative for.
    ///
    /// # Errors
    ///
    /// Returns the repository error on a cache miss.
    pub async fn get_authoritative_domains(&self) -> Result<Vec<String>, DomainError> {
        if let Ok(names) = self.domain_list.get(AUTHORITATIVE_KEY) {
            return Ok(names);
        }
        self.refresh_domains().await
    }

    /// Whether mail for `domain` should be accepted. Lookup failures count
    /// as "no".
    pub async fn is_authoritative(&self, domain: &str) -> bool {
        match self.get_authoritative_domains().await {
            Ok(names) => names.iter().any(|name| name.eq_ignore_ascii_case(domain)),
            Err(error) => {
                tracing::warn!(%domain, %error, "authoritative domain lookup failed");
                false
            }
        }
    }

    /// Decides whether inbound mail for `address` should be accepted.
    ///
    /// Mail for domains we are not authoritative for is accepted as is.
    /// For our own domains the address must belong to a live alias in the
    /// cached address list.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidRequest`] if `address` is not
    /// `user@domain`, [`DomainError::NotFound`] if no live alias has this
    /// address, or the repository error on a cache miss.
    pub async fn validate_recipient(&self, address: &str) -> Result<(), DomainError> {
        let Some((user, domain)) = address
            .split_once('@')
            .filter(|(user, domain)| !user.is_empty() && !domain.is_empty() && !domain.contains('@'))
        else {
            return Err(DomainError::InvalidRequest(format!("invalid email address {address:?}")));
        };
        if !self.is_authoritative(domain).await {
            return Ok(());
        }

        let domain = domain.to_ascii_lowercase();
        let addresses = self.get_aliases(&domain).await?;
        if addresses.iter().any(|known| known.eq_ignore_ascii_case(address)) {
            Ok(())
        } else {
            tracing::debug!(%user, %domain, "rejecting unknown recipient");
            Err(DomainError::NotFound(format!("alias {address}")))
        }
    }

    /// Rebuilds the address list of the alias's domain.
    pub async fn observe_alias_event(&self, kind: EventKind, alias: &Alias) {
        if let Err(error) = self.refresh_aliases(&alias.domain).await {
            tracing::warn!(domain = %alias.domain, %kind, %error, "address list refresh failed");
            if let Err(error) = self.address_lists.forget(&alias.domain) {
                tracing::warn!(domain = %alias.domain, %error, "address list eviction failed");
            }
        }
    }

    /// Rebuilds the authoritative domain list.
    pub async fn observe_domain_event(&self, kind: EventKind, domain: &DnsDomain) {
        if let Err(error) = self.refresh_domains().await {
            tracing::warn!(name = %domain.name, %kind, %error, "domain list refresh failed");
            if let Err(error) = self.domain_list.forget(AUTHORITATIVE_KEY) {
                tracing::warn!(%error, "domain list eviction failed");
            }
        }
    }

    async fn refresh_aliases(&self, domain: &str) -> Result<Vec<String>, DomainError> {
        let addresses = self.aliases.addresses_for_domain(domain).await?;
        self.address_lists.set(domain, addresses.clone())?;
        tracing::debug!(%domain, count = addresses.len(), "address list refreshed");
        Ok(addresses)
    }

    async fn refresh_domains(&self) -> Result<Vec<String>, DomainError> {
        let names = self.domains.authoritative_names().await?;
        self.domain_list.set(AUTHORITATIVE_KEY, names.clone())?;
        tracing::debug!(count = names.len(), "domain list refreshed");
        Ok(names)
    }
}
