//! Domain layer: helpdesk aggregates and their repository contracts.
//!
//! Every aggregate implements [`crate::events::Entity`], which gives it a
//! stable type name (also its cache prefix) and an instance id for topics.

pub mod alias;
pub mod dns_domain;
pub mod ticket;
pub mod user;

pub use alias::{Alias, AliasRepository, FindAliasParameters};
pub use dns_domain::{DnsDomain, DnsDomainRepository};
pub use ticket::{
    Ticket, TicketMeta, TicketRepository, TicketStatus, TicketTransition, TicketUpdateParameters,
};
pub use user::{User, UserRepository};
