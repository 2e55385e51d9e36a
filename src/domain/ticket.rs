//! Ticket aggregate and its repository contract.
//!
//! A ticket is an append-only list of [`TicketTransition`]s; its current
//! description, status and owner are folded from the latest transition
//! that sets each field (see [`Ticket::meta`]).

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::events::Entity;

/// Workflow status of a ticket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// No status change in this transition.
    #[default]
    Unset,
    /// Newly opened.
    Open,
    /// Being worked on.
    InProgress,
    /// Waiting on something external.
    Blocked,
    /// Resolved.
    Closed,
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unset => "Unset",
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Blocked => "Blocked",
            Self::Closed => "Closed",
        })
    }
}

/// One change to a ticket. `None` fields leave the previous value alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketTransition {
    /// When the change happened.
    pub timestamp: DateTime<Utc>,
    /// New status, or [`TicketStatus::Unset`] for no change.
    pub status: TicketStatus,
    /// New owner.
    pub owner_id: Option<u64>,
    /// New description.
    pub description: Option<String>,
}

/// Ticket aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier.
    pub id: u64,
    /// Full change history.
    pub transitions: Vec<TicketTransition>,
}

/// Current view of a ticket folded from its transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TicketMeta {
    /// Latest description.
    pub description: String,
    /// Latest status.
    pub status: TicketStatus,
    /// Latest owner.
    pub owner_id: Option<u64>,
}

impl Ticket {
    /// Folds the transitions into the current description, status and
    /// owner. For each field the transition with the latest timestamp that
    /// sets it wins, regardless of list order.
    #[must_use]
    pub fn meta(&self) -> TicketMeta {
        let mut meta = TicketMeta::default();
        let mut description_at: Option<DateTime<Utc>> = None;
        let mut status_at: Option<DateTime<Utc>> = None;
        let mut owner_at: Option<DateTime<Utc>> = None;

        for transition in &self.transitions {
            let newer = |seen: Option<DateTime<Utc>>| seen.is_none_or(|at| transition.timestamp > at);

            if let Some(description) = &transition.description
                && newer(description_at)
            {
                meta.description.clone_from(description);
                description_at = Some(transition.timestamp);
            }
            if transition.status != TicketStatus::Unset && newer(status_at) {
                meta.status = transition.status;
                status_at = Some(transition.timestamp);
            }
            if transition.owner_id.is_some() && newer(owner_at) {
                meta.owner_id = transition.owner_id;
                owner_at = Some(transition.timestamp);
            }
        }
        meta
    }
}

impl Entity for Ticket {
    const TYPE_NAME: &'static str = "tickets";

    fn entity_id(&self) -> String {
        self.id.to_string()
    }
}

/// Fields to change in an update. `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketUpdateParameters {
    /// New status, or [`TicketStatus::Unset`] for no change.
    pub status: TicketStatus,
    /// New owner.
    pub owner_id: Option<u64>,
    /// New description.
    pub description: Option<String>,
}

/// Repository of record for tickets.
#[async_trait]
pub trait TicketRepository: Send + Sync + fmt::Debug {
    /// Loads a ticket.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if no ticket has this id.
    async fn find(&self, id: u64) -> Result<Ticket, DomainError>;

    /// Opens a new ticket with the given description.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Repository`] on storage failure.
    async fn open(&self, description: &str) -> Result<Ticket, DomainError>;

    /// Appends a transition built from `params`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if no ticket has this id.
    async fn update(&self, id: u64, params: TicketUpdateParameters) -> Result<Ticket, DomainError>;
}
