//! Persistence layer: repositories of record.
//!
//! The domain layer only sees the repository traits; this module provides
//! in-memory implementations used by the binary and the tests.

pub mod memory;

pub use memory::{
    InMemoryAliasRepository, InMemoryDnsDomainRepository, InMemoryTicketRepository,
    InMemoryUserRepository,
};
