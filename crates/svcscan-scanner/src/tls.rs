//! TLS probe client
//!
//! Same probe surface as `TcpClient`; `connect` additionally performs a
//! TLS 1.2+ client handshake with SNI taken from the target name. Peer
//! certificates are captured (subject, issuer, negotiated cipher) but never
//! verified: the scanner records what a peer presents, it does not judge
//! it.

use crate::client::{http_exchange, read_chunk, write_payload, ProbeClient};
use crate::error::{NetError, NetResult};
use rustls::client::{ServerCertVerified, ServerCertVerifier};
use rustls::{Certificate, ClientConfig, OwnedTrustAnchor, RootCertStore, ServerName};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;
use svcscan_core::http::{Request, Response};
use svcscan_core::{Endpoint, HostState, Timeouts};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::{client::TlsStream, TlsConnector};
use tracing::{debug, trace};
use x509_parser::prelude::*;

/// Session details captured from a completed TLS handshake
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsInfo {
    /// Negotiated cipher suite name
    pub cipher: String,
    /// Peer certificate subject DN
    pub subject: String,
    /// Peer certificate issuer DN
    pub issuer: String,
}

/// TLS-wrapped probe client
pub struct TlsClient {
    connector: TlsConnector,
    timeouts: Timeouts,
    endpoint: Option<Endpoint>,
    stream: Option<TlsStream<TcpStream>>,
    connected: bool,
    state: HostState,
    last_error: Option<NetError>,
    tls_info: Option<TlsInfo>,
}

impl TlsClient {
    pub fn new(timeouts: Timeouts) -> Self {
        let mut root_store = RootCertStore::empty();
        root_store.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
            OwnedTrustAnchor::from_subject_spki_name_constraints(
                ta.subject,
                ta.spki,
                ta.name_constraints,
            )
        }));

        let mut config = ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        // Capture certificates without enforcing trust
        config
            .dangerous()
            .set_certificate_verifier(Arc::new(AcceptAllVerifier));

        Self {
            connector: TlsConnector::from(Arc::new(config)),
            timeouts,
            endpoint: None,
            stream: None,
            connected: false,
            state: HostState::Unknown,
            last_error: None,
            tls_info: None,
        }
    }

    /// Most recent error recorded on this client
    pub fn last_error(&self) -> Option<&NetError> {
        self.last_error.as_ref()
    }

    fn port(&self) -> u16 {
        self.endpoint.as_ref().map(|ep| ep.port).unwrap_or_default()
    }

    fn record(&mut self, err: NetError) -> NetError {
        if !matches!(err, NetError::HttpMalformed { .. }) {
            self.state = err.host_state(self.connected);
        }
        trace!("{}", err);
        self.last_error = Some(err.clone());
        err
    }

    /// Pull the cipher suite and peer certificate fields off an
    /// established session
    fn capture_session(stream: &TlsStream<TcpStream>) -> TlsInfo {
        let (_io, connection) = stream.get_ref();

        let cipher = connection
            .negotiated_cipher_suite()
            .map(|suite| format!("{:?}", suite.suite()))
            .unwrap_or_default();

        let mut info = TlsInfo {
            cipher,
            ..TlsInfo::default()
        };

        if let Some(certs) = connection.peer_certificates() {
            if let Some(cert_der) = certs.first() {
                if let Ok((_, cert)) = X509Certificate::from_der(&cert_der.0) {
                    info.subject = cert.subject().to_string();
                    info.issuer = cert.issuer().to_string();
                }
            }
        }

        info
    }
}

impl ProbeClient for TlsClient {
    async fn connect(&mut self, endpoint: &Endpoint, addr: SocketAddr) -> NetResult<()> {
        self.endpoint = Some(endpoint.clone());

        let tcp = match timeout(self.timeouts.connect, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => {
                return Err(self.record(NetError::from_io(&err, endpoint.port, false)))
            }
            Err(_elapsed) => {
                return Err(self.record(NetError::Timeout {
                    port: endpoint.port,
                }))
            }
        };

        let server_name = match ServerName::try_from(endpoint.addr.as_str()) {
            Ok(name) => name,
            Err(err) => {
                return Err(self.record(NetError::Other {
                    reason: format!("invalid SNI host '{}': {}", endpoint.addr, err),
                }))
            }
        };

        match timeout(
            self.timeouts.connect,
            self.connector.connect(server_name, tcp),
        )
        .await
        {
            Ok(Ok(stream)) => {
                debug!("TLS session established: {}/tcp", endpoint.port);
                self.tls_info = Some(Self::capture_session(&stream));
                self.stream = Some(stream);
                self.connected = true;
                self.state = HostState::Open;
                Ok(())
            }
            Ok(Err(err)) => Err(self.record(NetError::from_io(&err, endpoint.port, true))),
            Err(_elapsed) => Err(self.record(NetError::Timeout {
                port: endpoint.port,
            })),
        }
    }

    async fn recv(&mut self, buf: &mut [u8]) -> NetResult<usize> {
        let port = self.port();
        let recv_timeout = self.timeouts.recv;

        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => {
                return Err(self.record(NetError::Other {
                    reason: format!("receive on unconnected socket: {}/tcp", port),
                }))
            }
        };

        match read_chunk(stream, buf, recv_timeout, port, true).await {
            Ok(count) => Ok(count),
            Err(err) => Err(self.record(err)),
        }
    }

    async fn send(&mut self, data: &[u8]) -> NetResult<usize> {
        let port = self.port();
        let send_timeout = self.timeouts.send;

        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => {
                return Err(self.record(NetError::Other {
                    reason: format!("send on unconnected socket: {}/tcp", port),
                }))
            }
        };

        match write_payload(stream, data, send_timeout, port, true).await {
            Ok(count) => Ok(count),
            Err(err) => Err(self.record(err)),
        }
    }

    async fn request(&mut self, request: &Request) -> NetResult<Response> {
        let port = self.port();
        let timeouts = self.timeouts;

        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => {
                return Err(self.record(NetError::Other {
                    reason: format!("request on unconnected socket: {}/tcp", port),
                }))
            }
        };

        match http_exchange(stream, request, &timeouts, port, true).await {
            Ok(response) => Ok(response),
            Err(err) => Err(self.record(err)),
        }
    }

    async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        self.connected = false;
    }

    fn host_state(&self) -> HostState {
        self.state
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn tls_info(&self) -> Option<&TlsInfo> {
        self.tls_info.as_ref()
    }
}

/// Certificate verifier that accepts every peer certificate
///
/// The scanner captures certificate details for the report; trust
/// decisions are out of scope.
struct AcceptAllVerifier;

impl ServerCertVerifier for AcceptAllVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }
}
