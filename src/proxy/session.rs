//! Tunnel sessions
//!
//! A session pairs the hijacked client stream with the outbound server stream
//! for one CONNECT request and lives exactly as long as its relay.

use log::{error, info};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use uuid::Uuid;

use crate::common::Result;
use crate::config::ProxyConfig;
use crate::interface::BindAddress;
use super::dialer::dial;
use super::relay::{relay, RelayConfig, RelayReport};

/// Settings shared by every session
///
/// Built once at startup; read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunnelContext {
    pub bind_address: BindAddress,
    pub connect_timeout: Duration,
    pub relay: RelayConfig,
}

impl TunnelContext {
    pub fn new(bind_address: BindAddress, config: &ProxyConfig) -> Self {
        Self {
            bind_address,
            connect_timeout: config.connect_timeout(),
            relay: config.relay_config(),
        }
    }
}

/// One established tunnel
pub struct TunnelSession<C> {
    id: Uuid,
    client: C,
    server: TcpStream,
    target: String,
}

impl<C> TunnelSession<C>
where
    C: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Dial `target` for an already accepted client stream
    ///
    /// On failure the client stream is dropped, which closes it.
    pub async fn establish(client: C, target: String, context: &TunnelContext) -> Result<Self> {
        let server = dial(&target, context.bind_address, context.connect_timeout).await?;
        Ok(Self {
            id: Uuid::new_v4(),
            client,
            server,
            target,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Relay until either side stops; both streams are closed on return
    pub async fn run(self, config: RelayConfig) -> RelayReport {
        let Self { id, client, server, target } = self;
        let started = Instant::now();

        let report = relay(client, server, config).await;

        let elapsed = started.elapsed().as_millis();
        if report.termination.is_failure() {
            error!(
                "[{}] Tunnel to {} failed after {} ms: {} ({} bytes up, {} bytes down)",
                id, target, elapsed, report.termination, report.client_to_server, report.server_to_client,
            );
        } else {
            info!(
                "[{}] Tunnel to {} closed after {} ms: {} ({} bytes up, {} bytes down)",
                id, target, elapsed, report.termination, report.client_to_server, report.server_to_client,
            );
        }
        report
    }
}

/// Dial and relay for one hijacked connection
///
/// Every failure is logged and ends only this session.
pub async fn run_tunnel<C>(client: C, target: String, context: TunnelContext)
where
    C: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    match TunnelSession::establish(client, target.clone(), &context).await {
        Ok(session) => {
            info!("[{}] Connected to {} from {}", session.id(), session.target(), context.bind_address);
            session.run(context.relay).await;
        }
        Err(e) => error!("Tunnel to {} aborted: {}", target, e),
    }
}
