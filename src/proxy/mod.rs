//! Proxy service module
//!
//! CONNECT listener, outbound dial and the bidirectional relay.

pub mod relay;
pub mod server;
mod dialer;
mod handler;
mod session;

pub use dialer::{dial, resolve_ipv4};
pub use handler::{handle_request, NOT_CONNECT_BODY};
pub use relay::{relay, RelayConfig, RelayReport, Side, Termination};
pub use server::Proxy;
pub use session::{run_tunnel, TunnelContext, TunnelSession};
