//! Per-port probe task
//!
//! One probe runs per port: connect, read any banner the peer volunteers,
//! fall through to an HTTP(S) exchange when there is nothing to classify,
//! then finish the record against the port registry. Every failure along
//! the way is local to this port; the returned error exists only for
//! verbose diagnostics.

use crate::client::{ProbeClient, TcpClient, RECV_BUFFER_SIZE};
use crate::error::NetError;
use crate::tls::TlsClient;
use std::net::SocketAddr;
use svcscan_core::http::{Method, Request};
use svcscan_core::{Args, Endpoint, HostState, PortRegistry, ServiceInfo};
use tracing::trace;

/// Probe a single port, producing its completed `ServiceInfo`
///
/// The TLS flag on `args` selects the client; the probe logic itself is
/// identical across transports.
pub async fn probe_port(
    endpoint: &Endpoint,
    addr: SocketAddr,
    args: &Args,
    registry: &PortRegistry,
) -> (ServiceInfo, Option<NetError>) {
    if args.tls {
        let mut client = TlsClient::new(args.timeouts);
        run_probe(&mut client, endpoint, addr, args, registry, true).await
    } else {
        let mut client = TcpClient::new(args.timeouts);
        run_probe(&mut client, endpoint, addr, args, registry, false).await
    }
}

async fn run_probe<C: ProbeClient>(
    client: &mut C,
    endpoint: &Endpoint,
    addr: SocketAddr,
    args: &Args,
    registry: &PortRegistry,
    tls: bool,
) -> (ServiceInfo, Option<NetError>) {
    let mut info = ServiceInfo::new(endpoint);
    let mut probe_err = None;

    match client.connect(endpoint, addr).await {
        Ok(()) => {
            // A quiet peer is normal here; treat any read failure as an
            // empty banner and move on
            let mut buf = [0u8; RECV_BUFFER_SIZE];
            let bytes_read = client.recv(&mut buf).await.unwrap_or(0);

            if bytes_read > 0 {
                let banner = String::from_utf8_lossy(&buf[..bytes_read]).into_owned();
                info.parse_banner(&banner);
            }

            if args.curl || bytes_read == 0 {
                let method = if tls || args.curl {
                    Method::Get
                } else {
                    Method::Head
                };
                let request = Request::new(args.target.clone(), &args.uri).with_method(method);

                match client.request(&request).await {
                    Ok(response) if response.valid() => info.set_http(request, response, tls),
                    Ok(_) => trace!("Invalid HTTP response from {}", endpoint),
                    Err(err) => {
                        trace!("HTTP probe failed for {}: {}", endpoint, err);
                        probe_err = Some(err);
                    }
                }
            }

            client.disconnect().await;
        }
        Err(err) => probe_err = Some(err),
    }

    if let Some(session) = client.tls_info() {
        info.cipher = session.cipher.clone();
        info.subject = session.subject.clone();
        info.issuer = session.issuer.clone();
    }

    // A valid HTTP(S) response pins the port open regardless of how the
    // stream ended afterwards
    let state = if info.response.as_ref().is_some_and(|r| r.valid()) {
        HostState::Open
    } else {
        client.host_state()
    };

    info.classify(registry, state);

    (info, probe_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use svcscan_core::Timeouts;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn args_for(port: u16) -> Args {
        let mut args = Args::new("127.0.0.1", vec![port]);
        args.timeouts = Timeouts {
            connect: Duration::from_millis(500),
            recv: Duration::from_millis(200),
            send: Duration::from_millis(200),
        };
        args
    }

    async fn fixture() -> (TcpListener, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr)
    }

    #[tokio::test]
    async fn test_probe_closed_port() {
        let (listener, addr) = fixture().await;
        drop(listener);

        let registry = PortRegistry::load().unwrap();
        let endpoint = Endpoint::new("127.0.0.1", addr.port());
        let (info, err) = probe_port(&endpoint, addr, &args_for(addr.port()), &registry).await;

        assert_eq!(info.state, HostState::Closed);
        assert!(info.banner.is_empty());
        // Ephemeral fixture ports have no registry record
        assert_eq!(info.service, "unknown");
        assert!(matches!(err, Some(NetError::ConnectRefused { .. })));
    }

    #[tokio::test]
    async fn test_probe_banner_port() {
        let (listener, addr) = fixture().await;
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"SSH-2.0-OpenSSH_9.0\r\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
        });

        let registry = PortRegistry::load().unwrap();
        let endpoint = Endpoint::new("127.0.0.1", addr.port());
        let (info, _) = probe_port(&endpoint, addr, &args_for(addr.port()), &registry).await;

        assert_eq!(info.state, HostState::Open);
        assert_eq!(info.banner, "SSH-2.0-OpenSSH_9.0");
        assert_eq!(info.service, "ssh (2.0)");
        assert_eq!(info.summary, "OpenSSH 9.0");
        // A banner short-circuits the HTTP probe
        assert!(info.response.is_none());
    }

    #[tokio::test]
    async fn test_probe_http_port() {
        let (listener, addr) = fixture().await;
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut req = [0u8; 1024];
            let count = sock.read(&mut req).await.unwrap();
            assert!(req[..count].starts_with(b"HEAD / HTTP/1.1\r\n"));
            sock.write_all(b"HTTP/1.1 200 OK\r\nServer: nginx/1.25.3\r\n\r\n")
                .await
                .unwrap();
        });

        let registry = PortRegistry::load().unwrap();
        let endpoint = Endpoint::new("127.0.0.1", addr.port());
        let (info, _) = probe_port(&endpoint, addr, &args_for(addr.port()), &registry).await;

        assert_eq!(info.state, HostState::Open);
        assert_eq!(info.service, "http (11)");
        assert_eq!(info.summary, "nginx 1.25.3");
        assert_eq!(info.response.as_ref().unwrap().status, 200);
    }

    #[tokio::test]
    async fn test_probe_curl_sends_get() {
        let (listener, addr) = fixture().await;
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut req = [0u8; 1024];
            let count = sock.read(&mut req).await.unwrap();
            assert!(req[..count].starts_with(b"GET /health HTTP/1.1\r\n"));
            sock.write_all(b"HTTP/1.1 200 OK\r\nServer: Apache\r\n\r\n")
                .await
                .unwrap();
        });

        let registry = PortRegistry::load().unwrap();
        let mut args = args_for(addr.port());
        args.curl = true;
        args.uri = "/health".to_string();

        let endpoint = Endpoint::new("127.0.0.1", addr.port());
        let (info, _) = probe_port(&endpoint, addr, &args, &registry).await;

        assert_eq!(info.service, "http (11)");
        assert_eq!(info.request.as_ref().unwrap().method, Method::Get);
    }

    #[tokio::test]
    async fn test_probe_silent_open_port_uses_registry() {
        let (listener, addr) = fixture().await;
        tokio::spawn(async move {
            let (_sock, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
        });

        // Registry fixture: pretend the fixture port is port 22's record
        let blob: String = (1..=addr.port())
            .map(|p| format!("{},tcp,fixture,Fixture Service\n", p))
            .collect();
        let registry = PortRegistry::parse(&blob).unwrap();

        let endpoint = Endpoint::new("127.0.0.1", addr.port());
        let (info, _) = probe_port(&endpoint, addr, &args_for(addr.port()), &registry).await;

        // Connected but mute and not speaking HTTP: open, classified from
        // the registry
        assert_eq!(info.state, HostState::Open);
        assert_eq!(info.service, "fixture");
        assert_eq!(info.summary, "Fixture Service");
        assert!(info.banner.is_empty());
    }
}
