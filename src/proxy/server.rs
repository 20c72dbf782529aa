//! Proxy server module
//!
//! Accept loop for the CONNECT listener. Each accepted TCP connection is
//! served by hyper on its own task, so a slow or stuck client never holds up
//! `accept`.

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use log::{debug, error, info};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinSet;

use crate::common::{ProxyError, Result};
use super::handler::handle_request;
use super::session::TunnelContext;

/// Proxy server structure
///
/// Listens for CONNECT requests and opens tunnels from the context's bind address.
pub struct Proxy {
    /// Listen address for the proxy server
    listen_addr: SocketAddr,
    /// Settings handed to every tunnel
    context: TunnelContext,
}

impl Proxy {
    /// Create a new proxy instance
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use std::net::Ipv4Addr;
    /// # use egress_proxy::Proxy;
    /// # use egress_proxy::config::ProxyConfig;
    /// # use egress_proxy::interface::BindAddress;
    /// # use egress_proxy::proxy::TunnelContext;
    /// let config = ProxyConfig::default();
    /// let context = TunnelContext::new(BindAddress::new(Ipv4Addr::new(192, 168, 1, 20)), &config);
    /// let proxy = Proxy::new(config.listen, context);
    /// ```
    pub fn new(listen_addr: impl Into<SocketAddr>, context: TunnelContext) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            context,
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    pub fn context(&self) -> &TunnelContext {
        &self.context
    }

    /// Bind the listen address and serve until an error occurs
    ///
    /// # Errors
    ///
    /// Returns an error if it cannot bind to the listen address.
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.listen_addr).await
            .map_err(ProxyError::Io)?;

        self.serve(listener).await
    }

    /// Serve CONNECT requests on an already bound listener
    ///
    /// Accept errors are logged and the loop carries on.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr().map_err(ProxyError::Io)?;
        info!("Proxy service started, listening on {}", local_addr);
        info!("Outbound connections bound to {}", self.context.bind_address);

        let mut connections = JoinSet::new();

        loop {
            // Reap finished connection tasks
            while let Some(result) = connections.try_join_next() {
                if let Err(e) = result {
                    error!("Connection task error: {}", e);
                }
            }

            match listener.accept().await {
                Ok((stream, client_addr)) => {
                    debug!("Accepted connection from {}", client_addr);
                    let context = self.context;
                    connections.spawn(serve_connection(stream, client_addr, context));
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    if let Some(delay) = accept_backoff(&e) {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

/// Pause applied after an accept error that is not specific to one connection
const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// How long to wait before accepting again after `e`
///
/// Errors tied to a single incoming connection are retried at once. Anything
/// else, such as running out of file descriptors, would fail again immediately.
fn accept_backoff(e: &io::Error) -> Option<Duration> {
    match e.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset => None,
        _ => Some(ACCEPT_BACKOFF),
    }
}

async fn serve_connection(stream: tokio::net::TcpStream, client_addr: SocketAddr, context: TunnelContext) {
    let service = service_fn(move |req| handle_request(req, context));

    let result = http1::Builder::new()
        .timer(TokioTimer::new())
        .serve_connection(TokioIo::new(stream), service)
        .with_upgrades()
        .await;

    if let Err(e) = result {
        debug!("Connection from {} ended with error: {}", client_addr, ProxyError::from(e));
    }
}
