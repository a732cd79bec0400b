//! Runtime configuration for the announce engine.
//!
//! Loaded through the `config` crate's layered builder: built-in defaults,
//! then an optional config file, then `APP__`-prefixed environment variables
//! (loaded from an optional `.env` via `dotenvy`), mirroring how the rest of
//! the platform wires up its settings.

use ::config::{Config as ConfigBuilder, ConfigError as RawConfigError, Environment, File};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] RawConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Options the core consults while handling an announce.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Validate the announcer's ClientID against the connection's whitelist.
    pub client_whitelist_enabled: bool,

    /// Require an authenticated User via Passkey; disables auto-creating
    /// torrents and enables accounting-delta emission.
    pub private_enabled: bool,

    /// Purge a torrent once its peer count reaches zero (open mode only).
    pub purge_inactive_torrents: bool,

    /// Prefer peers sharing the announcer's subnet prefix during selection.
    pub preferred_subnet: bool,

    /// IPv4 subnet prefix length, 0..=32, used when `preferred_subnet` is set.
    pub preferred_ipv4_subnet: u8,

    /// IPv6 subnet prefix length, 0..=128, used when `preferred_subnet` is set.
    pub preferred_ipv6_subnet: u8,

    /// Interval (seconds) returned to clients between announces.
    pub announce_interval_secs: i64,

    /// Minimum interval (seconds) a well-behaved client should honor.
    pub min_announce_interval_secs: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_whitelist_enabled: false,
            private_enabled: false,
            purge_inactive_torrents: true,
            preferred_subnet: false,
            preferred_ipv4_subnet: 24,
            preferred_ipv6_subnet: 48,
            announce_interval_secs: 1800,
            min_announce_interval_secs: 900,
        }
    }
}

impl Config {
    /// Loads configuration from defaults, an optional `tracker.toml`, and
    /// `APP__`-prefixed environment variables (e.g. `APP__PRIVATE_ENABLED=true`).
    pub fn load() -> Result<Self, ConfigLoadError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let builder = ConfigBuilder::builder()
            .set_default("client_whitelist_enabled", defaults.client_whitelist_enabled)?
            .set_default("private_enabled", defaults.private_enabled)?
            .set_default("purge_inactive_torrents", defaults.purge_inactive_torrents)?
            .set_default("preferred_subnet", defaults.preferred_subnet)?
            .set_default(
                "preferred_ipv4_subnet",
                i64::from(defaults.preferred_ipv4_subnet),
            )?
            .set_default(
                "preferred_ipv6_subnet",
                i64::from(defaults.preferred_ipv6_subnet),
            )?
            .set_default("announce_interval_secs", defaults.announce_interval_secs)?
            .set_default(
                "min_announce_interval_secs",
                defaults.min_announce_interval_secs,
            )?
            .add_source(File::with_name("tracker").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"));

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate().map_err(ConfigLoadError::Invalid)?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.preferred_ipv4_subnet > 32 {
            return Err(format!(
                "preferred_ipv4_subnet must be 0..=32, got {}",
                self.preferred_ipv4_subnet
            ));
        }
        if self.preferred_ipv6_subnet > 128 {
            return Err(format!(
                "preferred_ipv6_subnet must be 0..=128, got {}",
                self.preferred_ipv6_subnet
            ));
        }
        if self.min_announce_interval_secs > self.announce_interval_secs {
            return Err("min_announce_interval_secs cannot exceed announce_interval_secs".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_oversized_ipv4_prefix() {
        let mut cfg = Config::default();
        cfg.preferred_ipv4_subnet = 33;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_inverted_intervals() {
        let mut cfg = Config::default();
        cfg.min_announce_interval_secs = cfg.announce_interval_secs + 1;
        assert!(cfg.validate().is_err());
    }
}
