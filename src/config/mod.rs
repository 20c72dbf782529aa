//! Configuration module
//!
//! This module handles application configuration, including loading from
//! different sources (files, environment variables, command line arguments)
//! and validating the result.
//!
//! Sources are applied in increasing priority:
//! 1. Default values
//! 2. Configuration file (JSON)
//! 3. Environment variables prefixed with `EGRESS_PROXY_`
//! 4. Command line arguments

pub(crate) mod defaults;
mod loader;
mod validator;

pub use self::defaults::{ENV_PREFIX, CONFIG_FILE_ENV, LISTEN_STR, ROUTE_TABLE_STR};
pub use self::loader::load_config;
pub use self::validator::validate_config;

use serde::{Deserialize, Deserializer, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::common::{parse_listen_addr, Result};
use crate::proxy::RelayConfig;

/// Deserialize the listen address through [`parse_listen_addr`]
fn deserialize_listen_addr<'de, D>(deserializer: D) -> std::result::Result<SocketAddr, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_listen_addr(&s).map_err(serde::de::Error::custom)
}

/// Proxy configuration
///
/// Built once at startup and treated as read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Address the CONNECT listener binds to
    #[serde(deserialize_with = "deserialize_listen_addr")]
    pub listen: SocketAddr,

    /// Network interface whose address outbound connections are bound to
    pub interface: Option<String>,

    /// Relay read chunk size in bytes
    pub buffer_size: usize,

    /// Chunks queued towards the relay dispatcher before readers block
    pub queue_depth: usize,

    /// Outbound connect timeout in seconds
    pub connect_timeout: u64,

    /// Log level
    pub log_level: String,

    /// Print policy routing hints at startup
    pub print_routes: bool,

    /// Routing table name used in the printed hints
    pub route_table: String,

    /// File this configuration was loaded from, if any
    #[serde(skip)]
    pub config_file: Option<PathBuf>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: defaults::listen(),
            interface: None,
            buffer_size: defaults::buffer_size(),
            queue_depth: defaults::queue_depth(),
            connect_timeout: defaults::connect_timeout(),
            log_level: defaults::log_level(),
            print_routes: defaults::print_routes(),
            route_table: defaults::route_table(),
            config_file: None,
        }
    }
}

/// Values supplied on the command line
///
/// Every field is optional; `None` leaves the lower-priority value in place.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub listen: Option<String>,
    pub interface: Option<String>,
    pub buffer_size: Option<usize>,
    pub queue_depth: Option<usize>,
    pub connect_timeout: Option<u64>,
    pub log_level: Option<String>,
    pub route_table: Option<String>,
    pub no_routes: bool,
}

impl ProxyConfig {
    /// Apply command line values on top of this configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the listen address cannot be parsed.
    pub fn with_overrides(mut self, cli: CliOverrides) -> Result<Self> {
        if let Some(listen) = cli.listen {
            self.listen = parse_listen_addr(&listen)?;
        }
        if let Some(interface) = cli.interface {
            self.interface = Some(interface);
        }
        if let Some(size) = cli.buffer_size {
            self.buffer_size = size;
        }
        if let Some(depth) = cli.queue_depth {
            self.queue_depth = depth;
        }
        if let Some(timeout) = cli.connect_timeout {
            self.connect_timeout = timeout;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        if let Some(table) = cli.route_table {
            self.route_table = table;
        }
        if cli.no_routes {
            self.print_routes = false;
        }
        Ok(self)
    }

    /// Relay tuning derived from this configuration
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            chunk_size: self.buffer_size,
            queue_depth: self.queue_depth,
        }
    }

    /// Outbound connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}
