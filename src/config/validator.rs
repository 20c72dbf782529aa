//! Configuration validator
//!
//! This module provides functionality for validating configuration.

use log::warn;

use crate::common::{ProxyError, Result};
use super::ProxyConfig;

/// Validate the configuration
pub fn validate_config(config: &ProxyConfig) -> Result<()> {
    validate_network_settings(config)?;
    validate_relay_settings(config)?;
    validate_general_settings(config)?;

    Ok(())
}

/// Validate network settings
fn validate_network_settings(config: &ProxyConfig) -> Result<()> {
    match config.interface.as_deref() {
        None => {
            return Err(ProxyError::Config(
                "A network interface name is required".to_string()
            ));
        }
        Some(name) if name.trim().is_empty() => {
            return Err(ProxyError::Config(
                "Network interface name must not be empty".to_string()
            ));
        }
        Some(_) => {}
    }

    // No authentication on the tunnel, so anything else is reachable by other hosts
    if !config.listen.ip().is_loopback() {
        warn!("Listening on non-loopback address {}; the tunnel is unauthenticated", config.listen);
    }

    if config.connect_timeout == 0 {
        return Err(ProxyError::Config(
            "connect_timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate relay settings
fn validate_relay_settings(config: &ProxyConfig) -> Result<()> {
    if config.buffer_size == 0 {
        return Err(ProxyError::Config(
            "buffer_size must be greater than 0".to_string()
        ));
    }

    if config.queue_depth == 0 {
        return Err(ProxyError::Config(
            "queue_depth must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate general settings
fn validate_general_settings(config: &ProxyConfig) -> Result<()> {
    match config.log_level.as_str() {
        "error" | "warn" | "info" | "debug" | "trace" => {}
        level => {
            warn!("Unrecognised log level: {}; it is passed to env_logger as a filter", level);
        }
    }

    if config.route_table.trim().is_empty() {
        return Err(ProxyError::Config(
            "route_table must not be empty".to_string()
        ));
    }

    Ok(())
}
