//! Configuration surfaces (`spec.md` §6): plain `serde`-derived option
//! structs with the spec's defaults, loadable from a TOML file the way a
//! command-line driver or service would externalize pool/health tuning
//! without hand-rolling a parser.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::NfsError;

/// Per-connection options (`Client.connect`).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Numeric uid presented in the AUTH_SYS credential.
    pub user_id: u32,
    /// Numeric gid presented in the AUTH_SYS credential.
    pub group_id: u32,
    /// Per-call deadline, milliseconds.
    #[serde(rename = "command_timeout_ms", with = "duration_ms")]
    pub command_timeout: Duration,
    /// Character encoding used for path/name strings on the wire; this crate
    /// only ever emits UTF-8 and the field exists for parity with the
    /// options surface, not because it changes encode/decode behavior.
    pub character_encoding: String,
    /// Bind a local port below 1024 before connecting (see `spec.md` §4.2).
    pub use_privileged_port: bool,
    /// Enable the path resolver's file-handle cache; disabling it forces a
    /// fresh LOOKUP chain on every resolve.
    pub use_handle_cache: bool,
    /// Fixed NFS port; `None` resolves it via the portmapper.
    pub nfs_port: Option<u16>,
    /// Fixed MOUNT port; `None` resolves it via the portmapper.
    pub mount_port: Option<u16>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            user_id: 0,
            group_id: 0,
            command_timeout: crate::protocol::rpc::DEFAULT_TIMEOUT,
            character_encoding: "utf-8".to_string(),
            use_privileged_port: false,
            use_handle_cache: true,
            nfs_port: None,
            mount_port: None,
        }
    }
}

/// [`crate::pool::Pool`] tuning (`Pool.new`).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolOptions {
    /// Maximum connections held per `(server, export, version)` key.
    pub max_pool_size: usize,
    /// An idle pooled connection older than this is destroyed on the next
    /// maintenance sweep.
    #[serde(rename = "idle_timeout_ms", with = "duration_ms")]
    pub idle_timeout: Duration,
    /// Whether the periodic maintenance sweep runs at all.
    pub enable_maintenance: bool,
    /// Cadence of the maintenance sweep.
    #[serde(rename = "maintenance_interval_ms", with = "duration_ms")]
    pub maintenance_interval: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_pool_size: 8,
            idle_timeout: Duration::from_secs(60),
            enable_maintenance: true,
            maintenance_interval: Duration::from_secs(30),
        }
    }
}

/// [`crate::health::HealthProbe`] tuning.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthOptions {
    /// Whether a background task drives the probe automatically.
    pub auto_heartbeat: bool,
    /// Cadence of the automatic heartbeat, when enabled.
    #[serde(rename = "heartbeat_interval_ms", with = "duration_ms")]
    pub heartbeat_interval: Duration,
    /// Consecutive probe failures before the connection is declared
    /// `Unhealthy` (a single failure is `Degraded`).
    pub unhealthy_threshold: u32,
    /// Deadline for one probe call.
    #[serde(rename = "health_check_timeout_ms", with = "duration_ms")]
    pub health_check_timeout: Duration,
}

impl Default for HealthOptions {
    fn default() -> Self {
        Self {
            auto_heartbeat: false,
            heartbeat_interval: Duration::from_secs(15),
            unhealthy_threshold: 3,
            health_check_timeout: Duration::from_secs(5),
        }
    }
}

/// (De)serializes a [`Duration`] as a plain count of milliseconds, since
/// TOML has no native duration type.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// The full set of options a driver might externalize in one TOML file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub client: ClientOptions,
    pub pool: PoolOptions,
    pub health: HealthOptions,
}

impl Config {
    /// Parses a `Config` from an in-memory TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, NfsError> {
        toml::from_str(text).map_err(|e| NfsError::InvalidState(format!("invalid config: {e}")))
    }

    /// Reads and parses a `Config` from a TOML file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, NfsError> {
        let text = fs::read_to_string(path.as_ref())
            .map_err(|e| NfsError::InvalidState(format!("reading config {}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        let parsed = Config::from_toml_str(&text).unwrap();
        assert_eq!(parsed.pool.max_pool_size, config.pool.max_pool_size);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = Config::from_toml_str("[pool]\nmax_pool_size = 4\n").unwrap();
        assert_eq!(config.pool.max_pool_size, 4);
        assert_eq!(config.pool.idle_timeout, PoolOptions::default().idle_timeout);
        assert_eq!(config.client.user_id, ClientOptions::default().user_id);
    }

    #[test]
    fn bad_toml_is_an_nfs_error() {
        assert!(Config::from_toml_str("not valid toml {{{").is_err());
    }
}
