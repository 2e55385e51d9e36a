//! Helpdesk configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Unset or unparsable numeric values
//! fall back to their defaults.

use std::time::Duration;

use anyhow::{Context, bail};

use crate::cache::StoreConfig;
use crate::events::{DEFAULT_SEPARATOR, LocalBusConfig, validate_separator};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Top-level configuration.
///
/// Loaded once at startup via [`HelpdeskConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpdeskConfig {
    /// Topic segment separator.
    pub event_separator: String,

    /// Number of event delivery workers.
    pub event_workers: usize,

    /// Maximum number of cache entries.
    pub cache_max_capacity: u64,

    /// Time-to-live of cache entries in seconds (0 = none).
    pub cache_ttl_secs: u64,

    /// Time-to-idle of cache entries in seconds (0 = none).
    pub cache_tti_secs: u64,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for HelpdeskConfig {
    fn default() -> Self {
        Self {
            event_separator: DEFAULT_SEPARATOR.to_string(),
            event_workers: 8,
            cache_max_capacity: 10_000,
            cache_ttl_secs: 0,
            cache_tti_secs: 0,
            log_format: LogFormat::Text,
        }
    }
}

impl HelpdeskConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `EVENT_SEPARATOR` is not one of
    /// [`crate::events::SEPARATORS`] (a separator that can appear inside an
    /// id would make every published subject unparsable), or `LOG_FORMAT`
    /// is neither `text` nor `json`.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`HelpdeskConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let event_separator = lookup("EVENT_SEPARATOR").unwrap_or(defaults.event_separator);
        validate_separator(&event_separator).context("invalid EVENT_SEPARATOR")?;

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase) {
            None => defaults.log_format,
            Some(format) => match format.as_str() {
                "text" | "" => LogFormat::Text,
                "json" => LogFormat::Json,
                other => bail!("invalid LOG_FORMAT {other:?}"),
            },
        };

        Ok(Self {
            event_separator,
            event_workers: parse_env(&lookup, "EVENT_WORKERS", defaults.event_workers).max(1),
            cache_max_capacity: parse_env(&lookup, "CACHE_MAX_CAPACITY", defaults.cache_max_capacity),
            cache_ttl_secs: parse_env(&lookup, "CACHE_TTL_SECS", defaults.cache_ttl_secs),
            cache_tti_secs: parse_env(&lookup, "CACHE_TTI_SECS", defaults.cache_tti_secs),
            log_format,
        })
    }

    /// Event bus settings.
    #[must_use]
    pub fn bus_config(&self) -> LocalBusConfig {
        LocalBusConfig::default()
            .separator(self.event_separator.clone())
            .workers(self.event_workers)
    }

    /// Backing store settings.
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        let mut config = StoreConfig::with_capacity(self.cache_max_capacity);
        if self.cache_ttl_secs > 0 {
            config = config.ttl(Duration::from_secs(self.cache_ttl_secs));
        }
        if self.cache_tti_secs > 0 {
            config = config.tti(Duration::from_secs(self.cache_tti_secs));
        }
        config
    }
}

/// Parses a variable as `T`, returning `default` on missing or invalid
/// values.
fn parse_env<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use tokio_test::assert_err;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<HelpdeskConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        HelpdeskConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let Ok(config) = load(&[]) else {
            panic!("defaults must load");
        };
        assert_eq!(config, HelpdeskConfig::default());
        let bus = config.bus_config();
        assert_eq!(bus.separator, ":");
        assert_eq!(bus.workers, 8);
        let store = config.store_config();
        assert_eq!(store.max_capacity, 10_000);
        assert_eq!(store.ttl, None);
        assert_eq!(store.tti, None);
    }

    #[test]
    fn overrides_and_fallbacks() {
        let Ok(config) = load(&[
            ("EVENT_SEPARATOR", "/"),
            ("EVENT_WORKERS", "0"),
            ("CACHE_MAX_CAPACITY", "not-a-number"),
            ("CACHE_TTL_SECS", "30"),
            ("LOG_FORMAT", "JSON"),
        ]) else {
            panic!("config must load");
        };
        assert_eq!(config.event_separator, "/");
        assert_eq!(config.event_workers, 1);
        assert_eq!(config.cache_max_capacity, 10_000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.store_config().ttl, Some(Duration::from_secs(30)));
    }

    #[test]
    fn rejects_bad_separator_and_format() {
        assert_err!(load(&[("EVENT_SEPARATOR", "")]));
        assert_err!(load(&[("EVENT_SEPARATOR", "*")]));
        assert_err!(load(&[("LOG_FORMAT", "xml")]));
    }

    #[test]
    fn separator_must_not_occur_in_ids() {
        // UUID ids contain '-', so '-' would split every dns domain subject
        let uuid = uuid::Uuid::new_v4().to_string();
        assert!(uuid.contains('-'));
        for separator in ["-", "_", "0", "a"] {
            assert_err!(load(&[("EVENT_SEPARATOR", separator)]));
        }
        for separator in [":", ".", "/", "|"] {
            let Ok(config) = load(&[("EVENT_SEPARATOR", separator)]) else {
                panic!("{separator:?} is id-safe");
            };
            assert!(!uuid.contains(separator));
            assert_eq!(config.bus_config().separator, separator);
        }
    }
}
