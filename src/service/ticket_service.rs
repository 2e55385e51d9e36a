//! Ticket service: repository writes, lifecycle events and a coherent cache.

use std::sync::Arc;

use futures_util::FutureExt;

use super::coherence::{CoherenceObserver, Loader};
use crate::cache::{Cache, CacheDriver};
use crate::domain::{Ticket, TicketRepository, TicketUpdateParameters};
use crate::error::{CacheError, DomainError};
use crate::events::{Entity, EventBus, EventBusDriver, EventKind};

/// Orchestration layer for ticket operations.
///
/// Every mutation follows the pattern: write through the repository →
/// publish the lifecycle event → return the aggregate. The service's own
/// [`CoherenceObserver`] picks the event up and refreshes the cache.
#[derive(Debug, Clone)]
pub struct TicketService {
    repo: Arc<dyn TicketRepository>,
    events: EventBus<Ticket>,
    observer: Arc<CoherenceObserver<Ticket>>,
}

impl TicketService {
    /// Creates the service and subscribes its cache observer.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] if the cache or the subscription cannot be
    /// set up.
    pub fn new(
        repo: Arc<dyn TicketRepository>,
        event_driver: Arc<dyn EventBusDriver>,
        cache_driver: Arc<dyn CacheDriver>,
    ) -> Result<Self, DomainError> {
        let cache = Cache::new(Ticket::TYPE_NAME, cache_driver)?;
        let observer = Arc::new(CoherenceObserver::new(cache, ticket_loader(&repo)));
        let service = Self {
            repo,
            events: EventBus::new(event_driver),
            observer,
        };
        let handle = service.clone();
        service.events.subscribe(None, &EventKind::ALL, move |kind, ticket: Ticket| {
            let service = handle.clone();
            async move { service.observe_ticket_event(kind, &ticket).await }
        })?;
        Ok(service)
    }

    /// Returns a ticket, from the cache when present.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if the repository has no such
    /// ticket.
    pub async fn get_ticket(&self, id: u64) -> Result<Ticket, DomainError> {
        let key = id.to_string();
        match self.cache().get(&key) {
            Ok(ticket) => return Ok(ticket),
            Err(CacheError::NotFound) => {}
            Err(error) => tracing::warn!(%id, %error, "ignoring unusable cached ticket"),
        }

        let ticket = self.repo.find(id).await?;
        if let Err(error) = self.cache().set(&key, ticket.clone()) {
            tracing::warn!(%id, %error, "failed to cache ticket");
        }
        Ok(ticket)
    }

    /// Opens a new ticket and publishes a create event.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] if the repository write fails. A failed
    /// publish is logged and does not fail the call.
    pub async fn open_ticket(&self, description: &str) -> Result<Ticket, DomainError> {
        let ticket = self.repo.open(description).await?;
        self.publish(EventKind::Create, &ticket);
        tracing::info!(id = ticket.id, "ticket opened");
        Ok(ticket)
    }

    /// Appends a transition and publishes an update event.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] if the repository write fails. A failed
    /// publish is logged and does not fail the call.
    pub async fn update_ticket(
        &self,
        id: u64,
        params: TicketUpdateParameters,
    ) -> Result<Ticket, DomainError> {
        let ticket = self.repo.update(id, params).await?;
        self.publish(EventKind::Update, &ticket);
        tracing::info!(%id, status = %ticket.meta().status, "ticket updated");
        Ok(ticket)
    }

    /// Cache observer entry point; refreshes or evicts the entry for
    /// `ticket.id`.
    pub async fn observe_ticket_event(&self, kind: EventKind, ticket: &Ticket) {
        self.observer.observe(kind, ticket).await;
    }

    /// The ticket cache.
    #[must_use]
    pub fn cache(&self) -> &Cache<Ticket> {
        self.observer.cache()
    }

    fn publish(&self, kind: EventKind, ticket: &Ticket) {
        if let Err(error) = self.events.publish_entity(kind, ticket) {
            tracing::warn!(id = ticket.id, %kind, %error, "ticket event not published");
        }
    }
}

fn ticket_loader(repo: &Arc<dyn TicketRepository>) -> Loader<Ticket> {
    let repo = Arc::clone(repo);
    Arc::new(move |id: String| {
        let repo = Arc::clone(&repo);
        async move {
            let id = id
                .parse::<u64>()
                .map_err(|_| DomainError::InvalidRequest(format!("ticket id {id:?}")))?;
            repo.find(id).await
        }
        .boxed()
    })
}
