//! Error handling module
//!
//! This module defines the error types and result type aliases used in the application.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Egress proxy error type
#[derive(Error, Debug)]
pub enum ProxyError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The named interface does not exist or has no enumerable addresses
    #[error("Interface not found: {0}")]
    InterfaceNotFound(String),

    /// Enumerating the interface addresses failed
    #[error("Failed to query addresses of interface {interface}: {source}")]
    InterfaceQuery {
        /// Interface name
        interface: String,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// No global unicast IPv4 address on the interface
    #[error("No global unicast IPv4 address found on interface {0}")]
    NoAddressFound(String),

    /// CONNECT target could not be resolved to an IPv4 endpoint
    #[error("Failed to resolve {target}: {reason}")]
    Resolve {
        /// Requested host:port
        target: String,
        /// Why resolution failed
        reason: String,
    },

    /// Outbound dial failed
    #[error("Failed to connect to {target} from {local}: {source}")]
    Dial {
        /// Requested host:port
        target: String,
        /// Local endpoint the socket was bound to
        local: SocketAddr,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// The HTTP connection could not be taken over as a raw stream
    #[error("Connection upgrade failed: {0}")]
    Upgrade(String),

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `ProxyError`.
pub type Result<T> = std::result::Result<T, ProxyError>;
