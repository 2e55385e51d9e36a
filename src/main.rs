//! ticketdesk entry point.
//!
//! Wires the services over in-memory repositories and runs until Ctrl-C.

use tracing_subscriber::EnvFilter;

use ticketdesk::app_state::{AppState, Repositories};
use ticketdesk::config::{HelpdeskConfig, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = HelpdeskConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    // Build application state
    let state = AppState::build(&config, Repositories::in_memory())?;
    tracing::info!(
        separator = %config.event_separator,
        workers = state.event_bus.worker_count(),
        subscriptions = state.event_bus.subscription_count(),
        cache_capacity = config.cache_max_capacity,
        "ticketdesk ready"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!(cached = state.store.entry_count(), "shutting down");

    Ok(())
}
