//! Configuration for the dialing engine
//!
//! All intervals that cross a persistence or API boundary are expressed in
//! whole seconds; inside the process they are `std::time::Duration`, so no
//! call site ever has to guess the unit.

use std::time::Duration;

use autodial_telephony_core::ControlPlaneConfig;

/// Top-level configuration with one section per concern.
#[derive(Debug, Clone, Default)]
pub struct DialerConfig {
    pub general: GeneralConfig,
    pub database: DatabaseConfig,
    pub watcher: WatcherConfig,
    pub telephony: ControlPlaneConfig,
}

/// Pacing and identity settings for the dispatch loop.
#[derive(Debug, Clone)]
pub struct GeneralConfig {
    /// Name of the conversational agent dispatched into every session.
    pub agent_name: String,
    /// Prefix for the SIP participant identity; the destination number is
    /// appended, e.g. `customer_+34600111222`.
    pub caller_identity_prefix: String,
    /// Grace period between agent dispatch and dial-out so the agent is
    /// ready before the callee picks up.
    pub agent_warmup: Duration,
    /// Pause after every attempt so the trunk can release resources.
    pub cooldown: Duration,
    /// Sleep when a full pass over all campaigns found nothing to do.
    pub idle_wait: Duration,
    /// Extended pause after an unexpected loop-level error.
    pub error_pause: Duration,
    /// Cadence of the background status monitor.
    pub monitor_interval: Duration,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            agent_name: "survey-agent".to_string(),
            caller_identity_prefix: "customer".to_string(),
            agent_warmup: Duration::from_secs(4),
            cooldown: Duration::from_secs(5),
            idle_wait: Duration::from_secs(10),
            error_pause: Duration::from_secs(30),
            monitor_interval: Duration::from_secs(10),
        }
    }
}

/// Where campaign state lives.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the sqlite file; `None` keeps everything in memory, which is
    /// what the tests use.
    pub database_path: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            max_connections: 5,
        }
    }
}

/// Completion detection settings.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Interval between polls of the session and the call record.
    pub poll_interval: Duration,
    /// Upper bound on how long a single call is watched before the outcome
    /// is synthesized as unreached.
    pub max_wait: Duration,
    /// Consecutive "session gone" observations required before absence is
    /// believed.
    pub gone_confirmations: u32,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(600),
            gone_confirmations: 2,
        }
    }
}

impl DialerConfig {
    /// Validate settings that would otherwise fail deep inside the loop.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.general.agent_name.is_empty() {
            return Err(crate::error::DialerError::Configuration(
                "general.agent_name must not be empty".to_string(),
            ));
        }
        if self.watcher.poll_interval.is_zero() {
            return Err(crate::error::DialerError::Configuration(
                "watcher.poll_interval must be positive".to_string(),
            ));
        }
        if self.watcher.gone_confirmations == 0 {
            return Err(crate::error::DialerError::Configuration(
                "watcher.gone_confirmations must be at least 1".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(crate::error::DialerError::Configuration(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(DialerConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut config = DialerConfig::default();
        config.watcher.poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_agent_name_is_rejected() {
        let mut config = DialerConfig::default();
        config.general.agent_name.clear();
        assert!(config.validate().is_err());
    }
}
