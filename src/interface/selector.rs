//! Source address selection
//!
//! Picks the address outbound tunnel connections are bound to: the first
//! global unicast IPv4 address configured on a named interface.

use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use ipnet::Ipv4Net;
use log::debug;

use crate::common::{ProxyError, Result};

/// One address entry reported for an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub ip: IpAddr,
    pub netmask: IpAddr,
}

impl InterfaceAddress {
    pub fn new(ip: impl Into<IpAddr>, netmask: impl Into<IpAddr>) -> Self {
        Self { ip: ip.into(), netmask: netmask.into() }
    }

    /// Interpret the entry as an IPv4 address with prefix
    ///
    /// Returns `None` for IPv6 entries and for netmasks that are not a contiguous prefix.
    pub fn to_ipv4_net(&self) -> Option<Ipv4Net> {
        match (self.ip, self.netmask) {
            (IpAddr::V4(ip), IpAddr::V4(mask)) => {
                let prefix = ipnet::ipv4_mask_to_prefix(mask).ok()?;
                Ipv4Net::new(ip, prefix).ok()
            }
            _ => None,
        }
    }
}

/// Source of interface address information
///
/// Implemented over the OS by [`SystemInterfaces`]; tests substitute a fixed list.
#[cfg_attr(test, mockall::automock)]
pub trait InterfaceSource {
    /// List the addresses configured on `name`, in platform order
    ///
    /// Returns `Ok(None)` when no interface with that name exists.
    fn addresses(&self, name: &str) -> io::Result<Option<Vec<InterfaceAddress>>>;
}

/// Interface enumeration backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn addresses(&self, name: &str) -> io::Result<Option<Vec<InterfaceAddress>>> {
        let addrs: Vec<InterfaceAddress> = get_if_addrs::get_if_addrs()?
            .into_iter()
            .filter(|iface| iface.name == name)
            .map(|iface| match iface.addr {
                get_if_addrs::IfAddr::V4(v4) => InterfaceAddress::new(v4.ip, v4.netmask),
                get_if_addrs::IfAddr::V6(v6) => InterfaceAddress::new(v6.ip, v6.netmask),
            })
            .collect();

        if addrs.is_empty() {
            Ok(None)
        } else {
            Ok(Some(addrs))
        }
    }
}

/// Local IPv4 address outbound connections are bound to
///
/// Chosen once at startup and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindAddress(Ipv4Addr);

impl BindAddress {
    /// Wrap an address without checking it
    ///
    /// Addresses produced by [`AddressSelector`] are always global unicast;
    /// this constructor exists for callers that pick the address themselves.
    pub const fn new(ip: Ipv4Addr) -> Self {
        Self(ip)
    }

    pub const fn ip(&self) -> Ipv4Addr {
        self.0
    }

    /// Local endpoint with an ephemeral port
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.0, 0))
    }
}

impl fmt::Display for BindAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<BindAddress> for IpAddr {
    fn from(addr: BindAddress) -> Self {
        IpAddr::V4(addr.0)
    }
}

/// Whether `ip` is usable for general routed traffic
///
/// Excludes unspecified, limited broadcast, loopback, multicast and link-local.
/// Private ranges count as global unicast.
pub fn is_global_unicast(ip: Ipv4Addr) -> bool {
    !(ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_loopback()
        || ip.is_multicast()
        || ip.is_link_local())
}

/// First global unicast IPv4 network among `addrs`, in the given order
pub fn first_global_unicast(addrs: &[InterfaceAddress]) -> Option<Ipv4Net> {
    addrs
        .iter()
        .filter_map(InterfaceAddress::to_ipv4_net)
        .find(|net| is_global_unicast(net.addr()))
}

/// Chooses the bind address from an interface's configured addresses
pub struct AddressSelector<S = SystemInterfaces> {
    source: S,
}

impl AddressSelector<SystemInterfaces> {
    pub fn system() -> Self {
        Self::new(SystemInterfaces)
    }
}

impl<S: InterfaceSource> AddressSelector<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Return the first global unicast IPv4 address on `interface`
    ///
    /// The result depends on the platform's enumeration order when more than
    /// one address qualifies.
    ///
    /// # Errors
    ///
    /// * `InterfaceQuery` if enumeration fails
    /// * `InterfaceNotFound` if no interface has that name
    /// * `NoAddressFound` if no entry qualifies
    pub fn select(&self, interface: &str) -> Result<BindAddress> {
        let addrs = self
            .source
            .addresses(interface)
            .map_err(|source| ProxyError::InterfaceQuery {
                interface: interface.to_string(),
                source,
            })?
            .ok_or_else(|| ProxyError::InterfaceNotFound(interface.to_string()))?;

        debug!("Interface {} has {} address(es)", interface, addrs.len());

        first_global_unicast(&addrs)
            .map(|net| BindAddress::new(net.addr()))
            .ok_or_else(|| ProxyError::NoAddressFound(interface.to_string()))
    }
}

/// Select the source address for `interface` using the system's interfaces
pub fn select_source_address(interface: &str) -> Result<BindAddress> {
    AddressSelector::system().select(interface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use std::net::Ipv6Addr;

    fn v4(ip: [u8; 4], mask: [u8; 4]) -> InterfaceAddress {
        InterfaceAddress::new(Ipv4Addr::from(ip), Ipv4Addr::from(mask))
    }

    fn selector_with(addrs: Vec<InterfaceAddress>) -> AddressSelector<MockInterfaceSource> {
        let mut source = MockInterfaceSource::new();
        source
            .expect_addresses()
            .with(eq("eth1"))
            .returning(move |_| Ok(Some(addrs.clone())));
        AddressSelector::new(source)
    }

    #[test]
    fn test_is_global_unicast() {
        assert!(is_global_unicast(Ipv4Addr::new(192, 168, 1, 20)));
        assert!(is_global_unicast(Ipv4Addr::new(10, 0, 0, 1)));
        assert!(is_global_unicast(Ipv4Addr::new(8, 8, 8, 8)));
        assert!(!is_global_unicast(Ipv4Addr::new(127, 0, 0, 1)));
        assert!(!is_global_unicast(Ipv4Addr::new(169, 254, 3, 4)));
        assert!(!is_global_unicast(Ipv4Addr::new(224, 0, 0, 251)));
        assert!(!is_global_unicast(Ipv4Addr::UNSPECIFIED));
        assert!(!is_global_unicast(Ipv4Addr::BROADCAST));
    }

    #[test]
    fn test_selects_first_qualifying_address() {
        let selector = selector_with(vec![
            v4([127, 0, 0, 1], [255, 0, 0, 0]),
            InterfaceAddress::new(
                "2001:db8::1".parse::<Ipv6Addr>().unwrap(),
                "ffff:ffff:ffff:ffff::".parse::<Ipv6Addr>().unwrap(),
            ),
            v4([169, 254, 10, 10], [255, 255, 0, 0]),
            v4([192, 168, 7, 42], [255, 255, 255, 0]),
            v4([10, 1, 2, 3], [255, 0, 0, 0]),
        ]);

        let addr = selector.select("eth1").unwrap();
        assert_eq!(addr.ip(), Ipv4Addr::new(192, 168, 7, 42));
        assert_eq!(addr.socket_addr().port(), 0);
    }

    #[test]
    fn test_skips_unparseable_netmask() {
        let selector = selector_with(vec![
            v4([192, 168, 7, 42], [255, 0, 255, 0]),
            v4([10, 1, 2, 3], [255, 0, 0, 0]),
        ]);

        assert_eq!(selector.select("eth1").unwrap().ip(), Ipv4Addr::new(10, 1, 2, 3));
    }

    #[test]
    fn test_no_qualifying_address() {
        let selector = selector_with(vec![
            v4([127, 0, 0, 1], [255, 0, 0, 0]),
            v4([169, 254, 10, 10], [255, 255, 0, 0]),
        ]);

        assert!(matches!(selector.select("eth1"), Err(ProxyError::NoAddressFound(name)) if name == "eth1"));
    }

    #[test]
    fn test_unknown_interface() {
        let mut source = MockInterfaceSource::new();
        source.expect_addresses().returning(|_| Ok(None));

        let result = AddressSelector::new(source).select("nope0");
        assert!(matches!(result, Err(ProxyError::InterfaceNotFound(_))));
    }

    #[test]
    fn test_query_failure() {
        let mut source = MockInterfaceSource::new();
        source
            .expect_addresses()
            .returning(|_| Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")));

        let result = AddressSelector::new(source).select("eth1");
        assert!(matches!(result, Err(ProxyError::InterfaceQuery { .. })));
    }

    #[test]
    fn test_selection_is_member_of_configured_set() {
        let addrs = vec![
            v4([169, 254, 1, 1], [255, 255, 0, 0]),
            v4([172, 16, 0, 9], [255, 240, 0, 0]),
            v4([203, 0, 113, 5], [255, 255, 255, 0]),
        ];
        let selected = selector_with(addrs.clone()).select("eth1").unwrap();

        assert!(addrs.iter().any(|a| a.ip == IpAddr::from(selected)));
        assert!(is_global_unicast(selected.ip()));
        // Same list, same answer
        assert_eq!(selector_with(addrs).select("eth1").unwrap(), selected);
    }

    #[test]
    fn test_system_source_reports_missing_interface() {
        let result = SystemInterfaces.addresses("definitely-not-an-interface0");
        assert!(matches!(result, Ok(None)));
    }
}
