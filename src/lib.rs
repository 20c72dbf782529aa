//! Egress Proxy: local HTTP CONNECT tunnel with a selectable source address
//!
//! The proxy accepts CONNECT requests on a loopback listener, dials each
//! requested destination with the local end bound to an address taken from a
//! chosen network interface, and relays bytes in both directions until either
//! side closes or fails. Combined with OS policy routing rules this sends the
//! tunnelled traffic out through that interface.
//!
//! # Example
//!
//! ```no_run
//! use egress_proxy::{select_source_address, Proxy, Result};
//! use egress_proxy::config::ProxyConfig;
//! use egress_proxy::proxy::TunnelContext;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ProxyConfig::default();
//!
//!     // Pick the first global unicast IPv4 address on eth1
//!     let bind_address = select_source_address("eth1")?;
//!
//!     let context = TunnelContext::new(bind_address, &config);
//!     Proxy::new(config.listen, context).run().await
//! }
//! ```

pub mod common;
pub mod config;
pub mod interface;
pub mod proxy;

// Re-export commonly used structures and functions for convenience
pub use common::{parse_listen_addr, ProxyError, Result};
pub use interface::{select_source_address, BindAddress};
pub use proxy::Proxy;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
