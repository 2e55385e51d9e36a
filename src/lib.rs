//! # ticketdesk
//!
//! Helpdesk core: an in-process publish/subscribe event bus with
//! wildcard topics, and read-through caches kept coherent with their
//! repositories by observing lifecycle events.
//!
//! ## Architecture
//!
//! ```text
//! Services (service/)
//!     │  write ──► Repositories (domain/ traits, persistence/)
//!     │  publish ─► EventBus<T> (events/) ─► LocalEventBus workers
//!     │                                          │
//!     │                                          ▼
//!     │                                CoherenceObserver<T>
//!     │                                          │ reload + set / forget
//!     └─ read ───► Cache<T> (cache/) ◄───────────┘
//!                      │
//!                      └── MokaStore
//! ```
//!
//! Topics are `entity:id:kind` subjects; subscribers may use `*` in any
//! segment. Delivery is asynchronous and unordered.

pub mod app_state;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod persistence;
pub mod service;
