//! User service.

use std::sync::Arc;

use futures_util::FutureExt;

use super::coherence::{CoherenceObserver, Loader};
use crate::cache::{Cache, CacheDriver};
use crate::domain::{User, UserRepository};
use crate::error::DomainError;
use crate::events::{Entity, EventBus, EventBusDriver, EventKind};

/// User lookups, creation and deletion with a coherent cache.
#[derive(Debug, Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    events: EventBus<User>,
    observer: Arc<CoherenceObserver<User>>,
}

impl UserService {
    /// Creates the service and subscribes its cache observer.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] if the cache or the subscription cannot be
    /// set up.
    pub fn new(
        repo: Arc<dyn UserRepository>,
        event_driver: Arc<dyn EventBusDriver>,
        cache_driver: Arc<dyn CacheDriver>,
    ) -> Result<Self, DomainError> {
        let cache = Cache::new(User::TYPE_NAME, cache_driver)?;
        let observer = Arc::new(CoherenceObserver::new(cache, user_loader(&repo)));
        let service = Self {
            repo,
            events: EventBus::new(event_driver),
            observer,
        };
        let handle = service.clone();
        service.events.subscribe(None, &EventKind::ALL, move |kind, user: User| {
            let service = handle.clone();
            async move { service.observe_user_event(kind, &user).await }
        })?;
        Ok(service)
    }

    /// Returns a user, from the cache when present.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if the user does not exist or was
    /// deleted.
    pub async fn get_user(&self, id: u64) -> Result<User, DomainError> {
        let key = id.to_string();
        if let Ok(user) = self.cache().get(&key) {
            return Ok(user);
        }
        let user = self.repo.find(id).await?;
        if let Err(error) = self.cache().set(&key, user.clone()) {
            tracing::warn!(%id, %error, "failed to cache user");
        }
        Ok(user)
    }

    /// Creates a user and publishes a create event.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidRequest`] for a blank name, or the
    /// repository error.
    pub async fn create_user(&self, first_name: &str, last_name: &str) -> Result<User, DomainError> {
        if first_name.trim().is_empty() {
            return Err(DomainError::InvalidRequest("first name is required".to_string()));
        }
        let user = self.repo.create(first_name, last_name).await?;
        self.publish(EventKind::Create, &user);
        tracing::info!(id = user.id, "user created");
        Ok(user)
    }

    /// Soft-deletes a user and publishes a delete event.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if the user does not exist.
    pub async fn delete_user(&self, id: u64) -> Result<User, DomainError> {
        let user = self.repo.delete(id).await?;
        self.publish(EventKind::Delete, &user);
        tracing::info!(%id, "user deleted");
        Ok(user)
    }

    /// Cache observer entry point.
    pub async fn observe_user_event(&self, kind: EventKind, user: &User) {
        self.observer.observe(kind, user).await;
    }

    /// The user cache.
    #[must_use]
    pub fn cache(&self) -> &Cache<User> {
        self.observer.cache()
    }

    fn publish(&self, kind: EventKind, user: &User) {
        if let Err(error) = self.events.publish_entity(kind, user) {
            tracing::warn!(id = user.id, %kind, %error, "user event not published");
        }
    }
}

fn user_loader(repo: &Arc<dyn UserRepository>) -> Loader<User> {
    let repo = Arc::clone(repo);
    Arc::new(move |id: String| {
        let repo = Arc::clone(&repo);
        async move {
            let id = id
                .parse::<u64>()
                .map_err(|_| DomainError::InvalidRequest(format!("user id {id:?}")))?;
            repo.find(id).await
        }
        .boxed()
    })
}
