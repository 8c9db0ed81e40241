//! # Configuration
//!
//! One TOML file, one section per unit, loaded once at startup. Every field
//! has a default, so an empty file (or no file) is a valid configuration.
//!
//! ```toml
//! [network]
//! tick_rate = 30
//! lock_window_secs = 1.0
//!
//! [moderation]
//! max_spawns_per_window = 40
//! warnings_before_ban = 3
//!
//! [lan]
//! clients = 3
//! ticks = 600
//! level = "Level 1-1"
//!
//! [lan.conditions]
//! packet_loss_percent = 2.0
//! ```

use std::path::Path;

use serde::Deserialize;
use tether_networking::{NetworkConditions, NetworkConfig};
use tether_security::ModerationConfig;

use crate::error::ConfigError;

/// Shape of an in-process LAN session.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LanConfig {
    /// Clients joining the host.
    pub clients: usize,
    /// Ticks to run.
    pub ticks: u64,
    /// Seed for the loopback fault injection.
    pub seed: u64,
    /// Faults applied to unreliable traffic.
    pub conditions: NetworkConditions,
    /// Level loaded before anyone joins.
    pub level: Option<String>,
    /// Put the host's [`tether_security::Moderator`] in charge. Otherwise
    /// only manual bans apply.
    pub moderated: bool,
}

impl Default for LanConfig {
    fn default() -> Self {
        Self {
            clients: 2,
            ticks: 300,
            seed: 0x7e7e,
            conditions: NetworkConditions::PERFECT,
            level: None,
            moderated: true,
        }
    }
}

/// The whole configuration file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    /// Replication tunables.
    pub network: NetworkConfig,
    /// Host moderation limits.
    pub moderation: ModerationConfig,
    /// LAN runner.
    pub lan: LanConfig,
}

impl TetherConfig {
    /// Reads and parses `path`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Parse`]
    /// if it is not a valid configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text)?;
        tracing::info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed TOML or a field of the wrong type.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(TetherConfig::parse("").unwrap(), TetherConfig::default());
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = TetherConfig::parse(
            r#"
            [network]
            tick_rate = 60
            allow_client_enemies = false

            [moderation]
            warnings_before_ban = 5

            [lan]
            clients = 4
            level = "Level 0-1"

            [lan.conditions]
            packet_loss_percent = 10.0
            "#,
        )
        .unwrap();

        assert_eq!(config.network.tick_rate, 60);
        assert!(!config.network.allow_client_enemies);
        assert_eq!(config.network.lock_window_secs, NetworkConfig::default().lock_window_secs);
        assert_eq!(config.moderation.warnings_before_ban, 5);
        assert_eq!(config.lan.clients, 4);
        assert_eq!(config.lan.level.as_deref(), Some("Level 0-1"));
        assert!((config.lan.conditions.packet_loss_percent - 10.0).abs() < f32::EPSILON);
        assert!(config.lan.conditions.duplicate_percent.abs() < f32::EPSILON);
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let err = TetherConfig::parse("[network]\ntick_rate = \"fast\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = TetherConfig::load("/definitely/not/here/tether.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("tether.toml"));
    }
}
