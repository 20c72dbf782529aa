//! CONNECT request handler
//!
//! Answers one HTTP request. Only CONNECT is accepted: the client gets a
//! `200` with no body, the connection is taken over once hyper has written
//! that response, and the tunnel runs on its own task.

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body_util::Full;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use log::{debug, error, info, warn};
use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;

use crate::common::{ProxyError, Result};
use super::session::{run_tunnel, TunnelContext};

/// Body returned for anything that is not CONNECT
pub const NOT_CONNECT_BODY: &str = "This server only supports CONNECT";

/// Handle a single request on an accepted connection
///
/// Never fails: every problem becomes a status code here or a log line in the
/// spawned tunnel task.
pub async fn handle_request<B>(
    mut req: Request<B>,
    context: TunnelContext,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    if req.method() != Method::CONNECT {
        warn!("Got a non-CONNECT request: {} {}", req.method(), req.uri());
        return Ok(text_response(StatusCode::NOT_IMPLEMENTED, NOT_CONNECT_BODY));
    }

    let Some(target) = req.uri().authority().map(|auth| auth.to_string()) else {
        warn!("CONNECT request without host:port target: {}", req.uri());
        return Ok(text_response(StatusCode::BAD_REQUEST, "CONNECT target must be host:port"));
    };
    info!("Desired destination: {}", target);

    let Some(on_upgrade) = req.extensions_mut().remove::<OnUpgrade>() else {
        error!("Error hijacking connection for {}: connection cannot be upgraded", target);
        return Ok(text_response(StatusCode::INTERNAL_SERVER_ERROR, "Couldn't take over connection"));
    };

    tokio::spawn(async move {
        match take_over(&target, on_upgrade).await {
            Ok(upgraded) => {
                debug!("Successfully hijacked connection for {}", target);
                run_tunnel(TokioIo::new(upgraded), target, context).await;
            }
            Err(e) => error!("Error hijacking connection: {}", e),
        }
    });

    Ok(Response::new(Full::new(Bytes::new())))
}

/// Wait for hyper to hand over the raw connection
async fn take_over<F, T, E>(target: &str, upgrade: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    upgrade
        .await
        .map_err(|e| ProxyError::Upgrade(format!("{}: {}", target, e)))
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::BindAddress;
    use crate::proxy::RelayConfig;
    use http_body_util::{BodyExt, Empty};
    use std::net::Ipv4Addr;
    use std::time::Duration;

    fn context() -> TunnelContext {
        TunnelContext {
            bind_address: BindAddress::new(Ipv4Addr::LOCALHOST),
            connect_timeout: Duration::from_secs(1),
            relay: RelayConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_get_is_not_implemented() {
        let req = Request::builder()
            .method(Method::GET)
            .uri("http://example.com/")
            .body(Empty::<Bytes>::new())
            .unwrap();

        let response = handle_request(req, context()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, NOT_CONNECT_BODY.as_bytes());
    }

    #[tokio::test]
    async fn test_connect_without_upgrade_is_internal_error() {
        let req = Request::builder()
            .method(Method::CONNECT)
            .uri("example.com:443")
            .body(Empty::<Bytes>::new())
            .unwrap();

        let response = handle_request(req, context()).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_failed_take_over_is_upgrade_error() {
        let upgrade = std::future::ready(Err::<(), _>("connection reset before upgrade"));

        let err = take_over("example.com:443", upgrade).await.unwrap_err();
        match err {
            ProxyError::Upgrade(msg) => {
                assert!(msg.contains("example.com:443"));
                assert!(msg.contains("connection reset"));
            }
            other => panic!("expected an upgrade error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_take_over_passes_stream_through() {
        let upgraded = take_over("example.com:443", std::future::ready(Ok::<_, &str>(7u8))).await;
        assert_eq!(upgraded.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_connect_without_authority_is_bad_request() {
        let req = Request::builder()
            .method(Method::CONNECT)
            .uri("/just-a-path")
            .body(Empty::<Bytes>::new())
            .unwrap();

        let response = handle_request(req, context()).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
