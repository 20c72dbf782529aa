//! Policy routing hints
//!
//! Renders the `ip route` / `ip rule` commands an operator can run so that
//! traffic sourced from the bind address leaves through the chosen interface.
//! Purely informational; nothing here affects the tunnel.

use std::fmt;
use std::net::Ipv4Addr;
use ipnet::Ipv4Net;

use super::selector::{is_global_unicast, InterfaceAddress};

const BANNER: &str = "==================== CONFIG INFORMATION ====================";
const FOOTER: &str = "============================================================";

/// Routing commands for one address on an interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingHint {
    pub interface: String,
    pub table: String,
    pub network: Ipv4Net,
}

impl RoutingHint {
    pub fn source(&self) -> Ipv4Addr {
        self.network.addr()
    }

    /// Guessed gateway: the network address with its last octet incremented
    pub fn gateway(&self) -> Ipv4Addr {
        let [a, b, c, d] = self.network.network().octets();
        Ipv4Addr::new(a, b, c, d.wrapping_add(1))
    }

    /// The shell commands, one per line
    pub fn commands(&self) -> Vec<String> {
        let src = self.source();
        vec![
            format!("sudo ip route flush table {}", self.table),
            format!(
                "sudo ip route add {} dev {} proto kernel src {} table main",
                self.network.trunc(), self.interface, src
            ),
            format!(
                "sudo ip route add default via {} dev {} table {}",
                self.gateway(), self.interface, self.table
            ),
            format!("sudo ip rule add from {}/32 table {}", src, self.table),
            format!("sudo ip rule add to {}/32 table {}", src, self.table),
        ]
    }
}

impl fmt::Display for RoutingHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", BANNER)?;
        for line in self.commands() {
            writeln!(f, "{}", line)?;
        }
        write!(f, "{}", FOOTER)
    }
}

/// Build one hint per global unicast IPv4 address in `addrs`
pub fn routing_hints(interface: &str, table: &str, addrs: &[InterfaceAddress]) -> Vec<RoutingHint> {
    addrs
        .iter()
        .filter_map(InterfaceAddress::to_ipv4_net)
        .filter(|net| is_global_unicast(net.addr()))
        .map(|network| RoutingHint {
            interface: interface.to_string(),
            table: table.to_string(),
            network,
        })
        .collect()
}
