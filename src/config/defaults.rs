//! Default configuration values
//!
//! Single source of truth for defaults, shared by serde, the loader and the CLI.

use std::net::SocketAddr;
use std::str::FromStr;

/// Environment variable prefix for all configuration options
pub const ENV_PREFIX: &str = "EGRESS_PROXY";

/// Environment variable naming a configuration file
pub const CONFIG_FILE_ENV: &str = "EGRESS_PROXY_CONFIG_FILE";

/// Default listen address as string
pub const LISTEN_STR: &str = "127.0.0.1:8080";

/// Default log level as string
pub const LOG_LEVEL_STR: &str = "info";

/// Default policy routing table used in printed hints
pub const ROUTE_TABLE_STR: &str = "rt2";

/// Default relay read chunk size in bytes
pub const BUFFER_SIZE: usize = 4096;

/// Default number of chunks the relay dispatcher queues before readers block
pub const QUEUE_DEPTH: usize = 8;

/// Default outbound connect timeout in seconds
pub const CONNECT_TIMEOUT: u64 = 30;

/// Default listen address
pub fn listen() -> SocketAddr {
    SocketAddr::from_str(LISTEN_STR)
        .expect("Default listen address should be valid")
}

/// Default log level
pub fn log_level() -> String {
    LOG_LEVEL_STR.to_string()
}

/// Default routing table name
pub fn route_table() -> String {
    ROUTE_TABLE_STR.to_string()
}

pub fn buffer_size() -> usize {
    BUFFER_SIZE
}

pub fn queue_depth() -> usize {
    QUEUE_DEPTH
}

pub fn connect_timeout() -> u64 {
    CONNECT_TIMEOUT
}

pub fn print_routes() -> bool {
    true
}
