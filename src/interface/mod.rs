//! Network interface module
//!
//! Resolves the local source address for outbound connections and renders
//! the policy routing commands an operator needs alongside it.

pub mod routing;
pub mod selector;

pub use routing::{routing_hints, RoutingHint};
pub use selector::{
    is_global_unicast, select_source_address, AddressSelector, BindAddress, InterfaceAddress,
    InterfaceSource, SystemInterfaces,
};
