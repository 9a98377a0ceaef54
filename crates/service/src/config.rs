//! Service configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! `LAPSYNC_*` environment variables, then command-line flags (applied by
//! the binary). [`ServiceConfig::validate`] runs on the final result.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use lapsync_errors::ConfigError;
use lapsync_telemetry_packets::{HEADER_SIZE, ProtocolEpoch};
use lapsync_telemetry_session::LapHeuristics;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Port the game broadcasts on by default.
pub const DEFAULT_UDP_PORT: u16 = 20777;
pub const DEFAULT_RECV_TIMEOUT_MS: u64 = 500;
/// Larger than any F1 2020–2022 datagram.
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 2048;

pub const ENV_UDP_PORT: &str = "LAPSYNC_UDP_PORT";
pub const ENV_BIND_ADDR: &str = "LAPSYNC_BIND_ADDR";
pub const ENV_RECV_TIMEOUT_MS: &str = "LAPSYNC_RECV_TIMEOUT_MS";

/// Where finished records go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// When false, records are dropped at the gateway.
    pub enabled: bool,
    /// Log records instead of sending them anywhere.
    pub dry_run: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dry_run: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub bind_addr: IpAddr,
    pub udp_port: u16,
    /// How long a receive may wait before the shutdown signal is checked.
    pub recv_timeout_ms: u64,
    pub max_datagram_size: usize,
    pub heuristics: LapHeuristics,
    pub sync: SyncSettings,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            udp_port: DEFAULT_UDP_PORT,
            recv_timeout_ms: DEFAULT_RECV_TIMEOUT_MS,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            heuristics: LapHeuristics::default(),
            sync: SyncSettings::default(),
        }
    }
}

impl ServiceConfig {
    /// Parse a YAML document. Missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let config = Self::from_yaml_str(&content)?;
        debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Defaults, overlaid with `path` when given, overlaid with the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `LAPSYNC_*` overrides looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_UDP_PORT) {
            self.udp_port = parse_env(ENV_UDP_PORT, &port)?;
        }
        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            self.bind_addr = parse_env(ENV_BIND_ADDR, &addr)?;
        }
        if let Some(timeout) = lookup(ENV_RECV_TIMEOUT_MS) {
            self.recv_timeout_ms = parse_env(ENV_RECV_TIMEOUT_MS, &timeout)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recv_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "recv_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.recv_timeout_ms > 60_000 {
            return Err(ConfigError::invalid(
                "recv_timeout_ms",
                "must be at most 60000",
            ));
        }
        let largest = largest_consumed_packet();
        if self.max_datagram_size < largest {
            return Err(ConfigError::invalid(
                "max_datagram_size",
                format!("must be at least {largest} bytes"),
            ));
        }
        self.heuristics.validate()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.udp_port)
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }
}

/// Size of the biggest packet any supported epoch consumes.
pub fn largest_consumed_packet() -> usize {
    ProtocolEpoch::ALL
        .iter()
        .flat_map(|epoch| {
            (0u8..=u8::MAX)
                .filter_map(move |id| epoch.packet_kind(id).and_then(|k| epoch.expected_size(k)))
        })
        .max()
        .unwrap_or(HEADER_SIZE)
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(key, e.to_string()))
}
