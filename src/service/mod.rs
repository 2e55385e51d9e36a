//! Service layer: business logic orchestration.
//!
//! Every service writes through its repository, publishes a lifecycle
//! event on the shared bus, and keeps its cache coherent by observing
//! those events (see [`coherence`]).

pub mod alias_service;
pub mod coherence;
pub mod dns_domain_service;
pub mod mail_service;
pub mod ticket_service;
pub mod user_service;

pub use alias_service::AliasService;
pub use coherence::{CoherenceObserver, Loader};
pub use dns_domain_service::DnsDomainService;
pub use mail_service::MailServerService;
pub use ticket_service::TicketService;
pub use user_service::UserService;
