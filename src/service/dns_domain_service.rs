//! DNS domain service.

use std::sync::Arc;

use futures_util::FutureExt;
use uuid::Uuid;

use super::coherence::{CoherenceObserver, Loader};
use crate::cache::{Cache, CacheDriver};
use crate::domain::{DnsDomain, DnsDomainRepository};
use crate::error::DomainError;
use crate::events::{Entity, EventBus, EventBusDriver, EventKind};

/// Tenant-scoped DNS domain management.
#[derive(Debug, Clone)]
pub struct DnsDomainService {
    repo: Arc<dyn DnsDomainRepository>,
    events: EventBus<DnsDomain>,
    observer: Arc<CoherenceObserver<DnsDomain>>,
}

impl DnsDomainService {
    /// Creates the service and subscribes its cache observer.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] if the cache or the subscription cannot be
    /// set up.
    pub fn new(
        repo: Arc<dyn DnsDomainRepository>,
        event_driver: Arc<dyn EventBusDriver>,
        cache_driver: Arc<dyn CacheDriver>,
    ) -> Result<Self, DomainError> {
        let cache = Cache::new(DnsDomain::TYPE_NAME, cache_driver)?;
        let observer = Arc::new(CoherenceObserver::new(cache, domain_loader(&repo)));
        let service = Self {
            repo,
            events: EventBus::new(event_driver),
            observer,
        };
        let handle = service.clone();
        service.events.subscribe(None, &EventKind::ALL, move |kind, domain: DnsDomain| {
            let service = handle.clone();
            async move { service.observe_domain_event(kind, &domain).await }
        })?;
        Ok(service)
    }

    /// Lists the domains of `tenant` and caches each of them.
    ///
    /// # Errors
    ///
    /// Returns the repository error.
    pub async fn get_domains(&self, tenant: Uuid) -> Result<Vec<DnsDomain>, DomainError> {
        let domains = self.repo.get_domains(tenant).await?;
        for domain in &domains {
            if let Err(error) = self.cache().set(&domain.entity_id(), domain.clone()) {
                tracing::warn!(id = %domain.id, %error, "failed to cache dns domain");
            }
        }
        Ok(domains)
    }

    /// Returns one domain of `tenant`, from the cache when present.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if the domain does not exist or
    /// belongs to another tenant.
    pub async fn get_domain(&self, tenant: Uuid, id: Uuid) -> Result<DnsDomain, DomainError> {
        let key = id.to_string();
        let domain = match self.cache().get(&key) {
            Ok(domain) => domain,
            Err(_) => {
                let domain = self.repo.find(id).await?;
                if let Err(error) = self.cache().set(&key, domain.clone()) {
                    tracing::warn!(%id, %error, "failed to cache dns domain");
                }
                domain
            }
        };
        if domain.tenant != tenant {
            return Err(DomainError::NotFound(format!("dns domain {id}")));
        }
        Ok(domain)
    }

    /// Registers `name` for `tenant`, caches it and publishes a create event.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidRequest`] for an empty or already
    /// registered name.
    pub async fn create_domain(&self, tenant: Uuid, name: &str) -> Result<DnsDomain, DomainError> {
        let name = name.trim().trim_end_matches('.').to_ascii_lowercase();
        if name.is_empty() {
            return Err(DomainError::InvalidRequest("domain name is required".to_string()));
        }
        let domain = DnsDomain {
            id: Uuid::new_v4(),
            tenant,
            name,
        };
        let domain = self.repo.create_domain(tenant, domain).await?;
        if let Err(error) = self.cache().set(&domain.entity_id(), domain.clone()) {
            tracing::warn!(id = %domain.id, %error, "failed to cache dns domain");
        }
        self.publish(EventKind::Create, &domain);
        tracing::info!(id = %domain.id, name = %domain.name, "dns domain created");
        Ok(domain)
    }

    /// Removes a domain of `tenant` and publishes a delete event.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if `tenant` owns no such domain.
    pub async fn delete_domain(&self, tenant: Uuid, id: Uuid) -> Result<DnsDomain, DomainError> {
        let domain = self.repo.delete_domain(tenant, id).await?;
        self.publish(EventKind::Delete, &domain);
        tracing::info!(%id, name = %domain.name, "dns domain deleted");
        Ok(domain)
    }

    /// Cache observer entry point.
    pub async fn observe_domain_event(&self, kind: EventKind, domain: &DnsDomain) {
        self.observer.observe(kind, domain).await;
    }

    /// The domain cache, keyed by domain id.
    #[must_use]
    pub fn cache(&self) -> &Cache<DnsDomain> {
        self.observer.cache()
    }

    fn publish(&self, kind: EventKind, domain: &DnsDomain) {
        if let Err(error) = self.events.publish_entity(kind, domain) {
            tracing::warn!(id = %domain.id, %kind, %error, "dns domain event not published");
        }
    }
}

fn domain_loader(repo: &Arc<dyn DnsDomainRepository>) -> Loader<DnsDomain> {
    let repo = Arc::clone(repo);
    Arc::new(move |id: String| {
        let repo = Arc::clone(&repo);
        async move {
            let id = Uuid::parse_str(&id)
                .map_err(|_| DomainError::InvalidRequest(format!("dns domain id {id:?}")))?;
            repo.find(id).await
        }
        .boxed()
    })
}
