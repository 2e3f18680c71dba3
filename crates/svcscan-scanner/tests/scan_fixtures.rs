//! End-to-end scan fixtures
//!
//! Each test stands up a real listener on 127.0.0.1 (or uses a
//! non-routable address) and drives a full engine scan through it.

use std::sync::Arc;
use std::time::Duration;
use svcscan_core::{Args, HostState, TaskStatus};
use svcscan_scanner::ScanEngine;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

fn fast_args(target: &str, ports: Vec<u16>) -> Args {
    let mut args = Args::new(target, ports);
    args.timeouts.connect = Duration::from_millis(400);
    args.timeouts.recv = Duration::from_millis(150);
    args.timeouts.send = Duration::from_millis(150);
    args
}

async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// TLS acceptor backed by the committed self-signed localhost certificate
fn tls_acceptor() -> TlsAcceptor {
    let cert = rustls::Certificate(include_bytes!("fixtures/localhost.crt").to_vec());
    let key = rustls::PrivateKey(include_bytes!("fixtures/localhost.key").to_vec());

    let config = rustls::ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(vec![cert], key)
        .unwrap();

    TlsAcceptor::from(Arc::new(config))
}

#[tokio::test]
async fn scan_closed_port_reports_closed() {
    let port = closed_port().await;

    let mut engine = ScanEngine::new(fast_args("127.0.0.1", vec![port])).unwrap();
    let report = engine.scan().await.unwrap();

    let services = report.table.services();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].port, port);
    assert_eq!(services[0].state, HostState::Closed);
    assert!(services[0].banner.is_empty());
    // Ephemeral ports sit past the embedded registry's range
    assert_eq!(services[0].service, "unknown");
}

#[tokio::test]
async fn scan_banner_port_classifies_service() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        loop {
            let (mut sock, _) = listener.accept().await.unwrap();
            let _ = sock.write_all(b"SSH-2.0-OpenSSH_9.0\r\n").await;
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    });

    let mut engine = ScanEngine::new(fast_args("127.0.0.1", vec![port])).unwrap();
    let report = engine.scan().await.unwrap();

    let info = &report.table.services()[0];
    assert_eq!(info.state, HostState::Open);
    assert_eq!(info.banner, "SSH-2.0-OpenSSH_9.0");
    assert!(info.service.contains("ssh"));
    assert_eq!(info.summary, "OpenSSH 9.0");
}

#[tokio::test]
async fn scan_http_port_populates_http_info() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        loop {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut req = [0u8; 2048];
            let _ = sock.read(&mut req).await;
            let _ = sock
                .write_all(b"HTTP/1.1 200 OK\r\nServer: nginx/1.25.3\r\n\r\n")
                .await;
        }
    });

    let mut engine = ScanEngine::new(fast_args("127.0.0.1", vec![port])).unwrap();
    let report = engine.scan().await.unwrap();

    let info = &report.table.services()[0];
    assert_eq!(info.state, HostState::Open);
    assert_eq!(info.service, "http (11)");
    assert_eq!(info.summary, "nginx 1.25.3");

    // JSON report carries the exchange
    let json = report.to_json();
    let svc = &json["scanResults"]["services"][0];
    assert_eq!(svc["state"], "open");
    assert_eq!(svc["httpInfo"]["response"]["status"], 200);
    assert_eq!(svc["httpInfo"]["request"]["method"], "HEAD");
    assert_eq!(
        svc["httpInfo"]["response"]["headers"]["Server"],
        "nginx/1.25.3"
    );
}

#[tokio::test]
async fn scan_timeout_reports_unknown() {
    // Documentation range: SYN is silently dropped
    let mut args = fast_args("192.0.2.1", vec![80]);
    args.timeouts.connect = Duration::from_millis(100);

    let mut engine = ScanEngine::new(args).unwrap();
    let report = engine.scan().await.unwrap();

    let info = &report.table.services()[0];
    assert_eq!(info.state, HostState::Unknown);
    assert!(info.banner.is_empty());
    // Port 80 still classifies from the registry
    assert_eq!(info.service, "http");
    assert_eq!(info.summary, "Hypertext Transfer Protocol");
}

#[tokio::test]
async fn scan_port_range_yields_one_record_per_port() {
    let mut ports = Vec::new();
    for _ in 0..3 {
        ports.push(closed_port().await);
    }

    let mut engine = ScanEngine::new(fast_args("127.0.0.1", ports.clone())).unwrap();
    let report = engine.scan().await.unwrap();

    let mut expected = ports.clone();
    expected.sort_unstable();

    let reported: Vec<u16> = report.table.services().iter().map(|s| s.port).collect();
    assert_eq!(reported, expected);

    let statuses = engine.statuses();
    assert!(statuses.values().all(|&s| s == TaskStatus::Complete));
}

#[tokio::test]
async fn scan_mixed_ports_errors_stay_local() {
    // One open HTTP port between two closed ones; the failures must not
    // disturb the successful probe
    let closed_a = closed_port().await;
    let closed_b = closed_port().await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open_port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        loop {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut req = [0u8; 2048];
            let _ = sock.read(&mut req).await;
            let _ = sock
                .write_all(b"HTTP/1.1 200 OK\r\nServer: Apache\r\n\r\n")
                .await;
        }
    });

    let ports = vec![closed_a, open_port, closed_b];
    let mut engine = ScanEngine::new(fast_args("127.0.0.1", ports)).unwrap();
    let report = engine.scan().await.unwrap();

    assert_eq!(report.table.services().len(), 3);

    let open: Vec<_> = report
        .table
        .services()
        .iter()
        .filter(|info| info.state == HostState::Open)
        .collect();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].port, open_port);
    assert_eq!(open[0].summary, "Apache");
}

#[tokio::test]
async fn scan_tls_port_captures_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let acceptor = tls_acceptor();

    tokio::spawn(async move {
        loop {
            let (sock, _) = listener.accept().await.unwrap();
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                if let Ok(mut tls) = acceptor.accept(sock).await {
                    let mut req = [0u8; 2048];
                    let _ = tls.read(&mut req).await;
                    let _ = tls
                        .write_all(b"HTTP/1.1 200 OK\r\nServer: Apache\r\n\r\n")
                        .await;
                    let _ = tls.shutdown().await;
                }
            });
        }
    });

    let mut args = fast_args("localhost", vec![port]);
    args.tls = true;
    // The handshake shares the connect budget; keep it roomy
    args.timeouts.connect = Duration::from_millis(1500);

    let mut engine = ScanEngine::new(args).unwrap();
    let report = engine.scan().await.unwrap();

    let info = &report.table.services()[0];
    assert_eq!(info.state, HostState::Open);
    assert_eq!(info.service, "https (11)");
    assert_eq!(info.summary, "Apache");
    assert!(!info.cipher.is_empty());
    assert!(info.subject.contains("localhost"));
    assert!(info.issuer.contains("localhost"));

    // TLS keys ride along in the JSON report
    let json = report.to_json();
    let svc = &json["scanResults"]["services"][0];
    assert!(svc["cipherSuite"].as_str().is_some_and(|s| !s.is_empty()));
    assert!(svc["x509Subject"]
        .as_str()
        .is_some_and(|s| s.contains("SvcScan Test")));
    assert_eq!(svc["httpInfo"]["request"]["method"], "GET");
    assert_eq!(svc["httpInfo"]["response"]["status"], 200);
}

#[tokio::test]
async fn scan_json_report_shape() {
    let port = closed_port().await;

    let mut args = fast_args("127.0.0.1", vec![port]);
    args.executable = "svcscan".to_string();
    args.argv = vec!["svcscan".to_string(), "127.0.0.1".to_string()];

    let mut engine = ScanEngine::new(args).unwrap();
    let report = engine.scan().await.unwrap();
    let json = report.to_json();

    assert_eq!(json["appInfo"]["name"], "SvcScan");
    assert!(json["scanSummary"]["startTime"].as_i64().unwrap() > 0);
    assert!(
        json["scanSummary"]["endTime"].as_i64().unwrap()
            >= json["scanSummary"]["startTime"].as_i64().unwrap()
    );
    assert_eq!(json["scanSummary"]["executable"], "svcscan");
    assert_eq!(json["scanResults"]["target"], "127.0.0.1");
    assert_eq!(
        json["scanResults"]["services"].as_array().unwrap().len(),
        1
    );
}
