//! Alias service.

use std::sync::Arc;

use futures_util::FutureExt;
use uuid::Uuid;

use super::coherence::{CoherenceObserver, Loader};
use crate::cache::{Cache, CacheDriver};
use crate::domain::{Alias, AliasRepository, FindAliasParameters};
use crate::error::DomainError;
use crate::events::{Entity, EventBus, EventBusDriver, EventKind};

/// Alias lookups, creation and deletion.
///
/// Lookups by id go through the cache; lookups by address always hit the
/// repository. Create and delete events also drive the mail server's
/// per-domain address lists (see [`super::MailServerService`]).
#[derive(Debug, Clone)]
pub struct AliasService {
    repo: Arc<dyn AliasRepository>,
    events: EventBus<Alias>,
    observer: Arc<CoherenceObserver<Alias>>,
}

impl AliasService {
    /// Creates the service and subscribes its cache observer.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] if the cache or the subscription cannot be
    /// set up.
    pub fn new(
        repo: Arc<dyn AliasRepository>,
        event_driver: Arc<dyn EventBusDriver>,
        cache_driver: Arc<dyn CacheDriver>,
    ) -> Result<Self, DomainError> {
        let cache = Cache::new(Alias::TYPE_NAME, cache_driver)?;
        let observer = Arc::new(CoherenceObserver::new(cache, alias_loader(&repo)));
        let service = Self {
            repo,
            events: EventBus::new(event_driver),
            observer,
        };
        let handle = service.clone();
        service.events.subscribe(None, &EventKind::ALL, move |kind, alias: Alias| {
            let service = handle.clone();
            async move { service.observe_alias_event(kind, &alias).await }
        })?;
        Ok(service)
    }

    /// Finds a live alias owned by `tenant`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidRequest`] when neither an id nor a full
    /// address is given, and [`DomainError::NotFound`] when nothing matches.
    pub async fn find(&self, tenant: Uuid, params: &FindAliasParameters) -> Result<Alias, DomainError> {
        if let Some(id) = params.id {
            if let Ok(alias) = self.cache().get(&id.to_string())
                && alias.tenant == tenant
            {
                return Ok(alias);
            }
        } else if params.user.is_none() || params.domain.is_none() {
            return Err(DomainError::InvalidRequest(
                "alias lookup needs an id or a user and domain".to_string(),
            ));
        }

        let alias = self.repo.find(tenant, params).await?;
        if let Err(error) = self.cache().set(&alias.entity_id(), alias.clone()) {
            tracing::warn!(id = alias.id, %error, "failed to cache alias");
        }
        Ok(alias)
    }

    /// Creates an alias and publishes a create event.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidRequest`] for an empty user or domain,
    /// or the repository error.
    pub async fn create(&self, tenant: Uuid, user: &str, domain: &str) -> Result<Alias, DomainError> {
        if user.is_empty() || domain.is_empty() {
            return Err(DomainError::InvalidRequest("alias needs a user and a domain".to_string()));
        }
        let alias = self.repo.create(tenant, user, domain).await?;
        self.publish(EventKind::Create, &alias);
        tracing::info!(id = alias.id, email = %alias.email(), "alias created");
        Ok(alias)
    }

    /// Soft-deletes an alias and publishes a delete event.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if `tenant` owns no such alias.
    pub async fn delete(&self, tenant: Uuid, id: u64) -> Result<Alias, DomainError> {
        let alias = self.repo.delete(tenant, id).await?;
        self.publish(EventKind::Delete, &alias);
        tracing::info!(%id, "alias deleted");
        Ok(alias)
    }

    /// Cache observer entry point.
    pub async fn observe_alias_event(&self, kind: EventKind, alias: &Alias) {
        self.observer.observe(kind, alias).await;
    }

    /// The alias cache, keyed by alias id.
    #[must_use]
    pub fn cache(&self) -> &Cache<Alias> {
        self.observer.cache()
    }

    fn publish(&self, kind: EventKind, alias: &Alias) {
        if let Err(error) = self.events.publish_entity(kind, alias) {
            tracing::warn!(id = alias.id, %kind, %error, "alias event not published");
        }
    }
}

fn alias_loader(repo: &Arc<dyn AliasRepository>) -> Loader<Alias> {
    let repo = Arc::clone(repo);
    Arc::new(move |id: String| {
        let repo = Arc::clone(&repo);
        async move {
            let id = id
                .parse::<u64>()
                .map_err(|_| DomainError::InvalidRequest(format!("alias id {id:?}")))?;
            repo.find_by_id(id).await
        }
        .boxed()
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cache::MokaStore;
    use crate::error::CacheError;
    use crate::events::{LocalBusConfig, LocalEventBus};
    use crate::persistence::InMemoryAliasRepository;

    fn service() -> AliasService {
        let Ok(driver) = LocalEventBus::new(LocalBusConfig::default()) else {
            panic!("bus creation failed");
        };
        let Ok(service) = AliasService::new(
            Arc::new(InMemoryAliasRepository::new()),
            Arc::new(driver),
            Arc::new(MokaStore::default()),
        ) else {
            panic!("service creation failed");
        };
        service
    }

    fn by_address(user: &str, domain: &str) -> FindAliasParameters {
        FindAliasParameters {
            user: Some(user.to_string()),
            domain: Some(domain.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn find_respects_tenant() {
        let service = service();
        let tenant = Uuid::new_v4();
        let Ok(created) = service.create(tenant, "test", "test.com").await else {
            panic!("create failed");
        };

        let Ok(found) = service.find(tenant, &by_address("test", "test.com")).await else {
            panic!("alias should be found");
        };
        assert_eq!(found, created);

        let other = service.find(Uuid::new_v4(), &by_address("test", "test.com")).await;
        assert!(matches!(other, Err(DomainError::NotFound(_))));

        let missing = service.find(tenant, &by_address("bob", "sample.com")).await;
        assert!(matches!(missing, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn find_by_id_uses_tenant_check() {
        let service = service();
        let tenant = Uuid::new_v4();
        let Ok(created) = service.create(tenant, "sample", "example.com").await else {
            panic!("create failed");
        };
        let params = FindAliasParameters {
            id: Some(created.id),
            ..Default::default()
        };
        assert!(service.find(tenant, &params).await.is_ok());
        assert!(service.find(Uuid::new_v4(), &params).await.is_err());
    }

    #[tokio::test]
    async fn incomplete_lookup_is_rejected() {
        let service = service();
        let params = FindAliasParameters {
            user: Some("bob".to_string()),
            ..Default::default()
        };
        let result = service.find(Uuid::new_v4(), &params).await;
        assert!(matches!(result, Err(DomainError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn delete_marks_and_evicts() {
        let service = service();
        let tenant = Uuid::new_v4();
        let Ok(created) = service.create(tenant, "gone", "example.com").await else {
            panic!("create failed");
        };
        let key = created.entity_id();
        let cached = tokio::time::timeout(Duration::from_secs(1), async {
            while service.cache().get(&key).as_ref() != Ok(&created) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(cached.is_ok());

        let Ok(deleted) = service.delete(tenant, created.id).await else {
            panic!("delete failed");
        };
        assert!(deleted.deleted_at.is_some());

        let evicted = tokio::time::timeout(Duration::from_secs(1), async {
            while service.cache().get(&key) != Err(CacheError::NotFound) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(evicted.is_ok());
    }
}
