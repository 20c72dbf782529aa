//! Listen address parsing
//!
//! The listener only takes literal IPv4 endpoints. Host names are refused
//! rather than resolved, so startup never blocks on DNS and never ends up on
//! an IPv6 loopback.

use std::net::{SocketAddr, SocketAddrV4};

use super::error::{ProxyError, Result};

/// Parse a listen address of the form `a.b.c.d:port`
///
/// # Errors
///
/// Returns `ProxyError::Config` for host names, IPv6 endpoints and anything
/// without an explicit port.
pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr> {
    let trimmed = addr.trim();

    match trimmed.parse::<SocketAddr>() {
        Ok(SocketAddr::V4(v4)) => Ok(SocketAddr::V4(v4)),
        Ok(SocketAddr::V6(v6)) => Err(ProxyError::Config(format!(
            "Listen address {} is IPv6; only IPv4 listeners are supported",
            v6
        ))),
        Err(_) => Err(ProxyError::Config(format!(
            "Invalid listen address {:?}: expected an IPv4 address and port, e.g. {}",
            addr,
            SocketAddrV4::new([127, 0, 0, 1].into(), 8080)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_parse_ipv4_literal() {
        let addr = parse_listen_addr("127.0.0.1:8080").unwrap();
        assert_eq!(addr, SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)));

        let addr = parse_listen_addr(" 0.0.0.0:3128 ").unwrap();
        assert_eq!(addr.port(), 3128);
    }

    #[test]
    fn test_ipv6_is_rejected() {
        let err = parse_listen_addr("[::1]:8080").unwrap_err();
        assert!(err.to_string().contains("IPv6"));
    }

    #[test]
    fn test_host_names_are_not_resolved() {
        assert!(matches!(parse_listen_addr("localhost:8080"), Err(ProxyError::Config(_))));
    }

    #[test]
    fn test_missing_port_is_rejected() {
        assert!(parse_listen_addr("127.0.0.1").is_err());
        assert!(parse_listen_addr("invalid-address").is_err());
    }
}
