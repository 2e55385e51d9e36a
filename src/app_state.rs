//! Composition root: one event bus, one backing store, every service.

use std::sync::Arc;

use crate::cache::{CacheDriver, MokaStore};
use crate::config::HelpdeskConfig;
use crate::domain::{AliasRepository, DnsDomainRepository, TicketRepository, UserRepository};
use crate::error::DomainError;
use crate::events::{EventBusDriver, LocalEventBus};
use crate::persistence::{
    InMemoryAliasRepository, InMemoryDnsDomainRepository, InMemoryTicketRepository,
    InMemoryUserRepository,
};
use crate::service::{AliasService, DnsDomainService, MailServerService, TicketService, UserService};

/// Repositories of record handed to [`AppState::build`].
#[derive(Debug, Clone)]
pub struct Repositories {
    /// Ticket store.
    pub tickets: Arc<dyn TicketRepository>,
    /// User store.
    pub users: Arc<dyn UserRepository>,
    /// Alias store.
    pub aliases: Arc<dyn AliasRepository>,
    /// DNS domain store.
    pub dns_domains: Arc<dyn DnsDomainRepository>,
}

impl Repositories {
    /// Empty in-memory repositories.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            tickets: Arc::new(InMemoryTicketRepository::new()),
            users: Arc::new(InMemoryUserRepository::new()),
            aliases: Arc::new(InMemoryAliasRepository::new()),
            dns_domains: Arc::new(InMemoryDnsDomainRepository::new()),
        }
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Ticket operations.
    pub tickets: Arc<TicketService>,
    /// User operations.
    pub users: Arc<UserService>,
    /// Alias operations.
    pub aliases: Arc<AliasService>,
    /// DNS domain operations.
    pub dns_domains: Arc<DnsDomainService>,
    /// Inbound mail lookups.
    pub mail: Arc<MailServerService>,
    /// Event bus shared by every service.
    pub event_bus: Arc<LocalEventBus>,
    /// Backing store shared by every cache.
    pub store: Arc<MokaStore>,
}

impl AppState {
    /// Starts the event bus and backing store and wires every service.
    ///
    /// Must be called from inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Event`] if the bus cannot start (no runtime,
    /// bad separator), or any service construction error.
    pub fn build(config: &HelpdeskConfig, repos: Repositories) -> Result<Self, DomainError> {
        let event_bus = Arc::new(LocalEventBus::new(config.bus_config())?);
        let store = Arc::new(MokaStore::new(&config.store_config()));
        let events: Arc<dyn EventBusDriver> = Arc::clone(&event_bus) as Arc<dyn EventBusDriver>;
        let cache: Arc<dyn CacheDriver> = Arc::clone(&store) as Arc<dyn CacheDriver>;

        let tickets = TicketService::new(repos.tickets, Arc::clone(&events), Arc::clone(&cache))?;
        let users = UserService::new(repos.users, Arc::clone(&events), Arc::clone(&cache))?;
        let aliases = AliasService::new(
            Arc::clone(&repos.aliases),
            Arc::clone(&events),
            Arc::clone(&cache),
        )?;
        let dns_domains = DnsDomainService::new(
            Arc::clone(&repos.dns_domains),
            Arc::clone(&events),
            Arc::clone(&cache),
        )?;
        let mail = MailServerService::new(repos.aliases, repos.dns_domains, events, cache)?;

        tracing::debug!(
            subscriptions = event_bus.subscription_count(),
            workers = event_bus.worker_count(),
            "services wired"
        );

        Ok(Self {
            tickets: Arc::new(tickets),
            users: Arc::new(users),
            aliases: Arc::new(aliases),
            dns_domains: Arc::new(dns_domains),
            mail: Arc::new(mail),
            event_bus,
            store,
        })
    }
}
