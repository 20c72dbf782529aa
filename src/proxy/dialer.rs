//! Outbound dial
//!
//! Resolves a CONNECT authority to an IPv4 endpoint and connects to it from
//! the configured bind address.

use log::debug;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio::time::timeout;

use crate::common::{ProxyError, Result};
use crate::interface::BindAddress;

/// Resolve `target` (`host:port`) to its first IPv4 socket address
pub async fn resolve_ipv4(target: &str) -> Result<SocketAddr> {
    let addrs = lookup_host(target).await.map_err(|e| ProxyError::Resolve {
        target: target.to_string(),
        reason: e.to_string(),
    })?;

    let mut addrs = addrs.filter(SocketAddr::is_ipv4);
    addrs.next().ok_or_else(|| ProxyError::Resolve {
        target: target.to_string(),
        reason: "no IPv4 address".to_string(),
    })
}

/// Connect to `target` with the local end bound to `bind` and an ephemeral port
///
/// # Errors
///
/// `Resolve` if the target has no IPv4 address, `Dial` if the socket cannot be
/// bound or the connection fails or times out.
pub async fn dial(target: &str, bind: BindAddress, connect_timeout: Duration) -> Result<TcpStream> {
    let remote = resolve_ipv4(target).await?;
    let local = bind.socket_addr();

    let dial_error = |source| ProxyError::Dial {
        target: target.to_string(),
        local,
        source,
    };

    let socket = TcpSocket::new_v4().map_err(dial_error)?;
    socket.bind(local).map_err(dial_error)?;

    debug!("Dialing {} ({}) from {}", target, remote, local);
    let stream = timeout(connect_timeout, socket.connect(remote))
        .await
        .map_err(|_| dial_error(std::io::Error::new(std::io::ErrorKind::TimedOut, "Connection timed out")))?
        .map_err(dial_error)?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    const LOOPBACK: BindAddress = BindAddress::new(Ipv4Addr::LOCALHOST);

    #[tokio::test]
    async fn test_resolve_literal() {
        let addr = resolve_ipv4("127.0.0.1:443").await.unwrap();
        assert_eq!(addr, "127.0.0.1:443".parse().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_ipv6_only_fails() {
        let result = resolve_ipv4("[::1]:443").await;
        assert!(matches!(result, Err(ProxyError::Resolve { .. })));
    }

    #[tokio::test]
    async fn test_resolve_without_port_fails() {
        assert!(resolve_ipv4("localhost").await.is_err());
    }

    #[tokio::test]
    async fn test_dial_binds_local_address() {
        // 127.0.0.2 is never the kernel's default source towards 127.0.0.1
        let bind = BindAddress::new(Ipv4Addr::new(127, 0, 0, 2));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap().to_string();

        let stream = dial(&target, bind, Duration::from_secs(5)).await.unwrap();
        let (_, peer) = listener.accept().await.unwrap();

        assert_eq!(peer.ip(), Ipv4Addr::new(127, 0, 0, 2));
        assert_eq!(peer, stream.local_addr().unwrap());
        assert_ne!(peer.port(), 0);
    }

    #[tokio::test]
    async fn test_dial_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = dial(&target, LOOPBACK, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(ProxyError::Dial { .. })));
    }
}
