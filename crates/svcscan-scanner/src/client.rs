//! TCP probe client and the shared probe surface
//!
//! `TcpClient` and `TlsClient` expose the same surface (connect, send,
//! recv, request, disconnect, host-state) and differ only in how the
//! stream comes up. The shared read/write/exchange helpers here are generic
//! over the stream type so both clients run the identical probe logic.

use crate::error::{NetError, NetResult};
use crate::tls::TlsInfo;
use std::net::SocketAddr;
use svcscan_core::http::{Request, Response};
use svcscan_core::{Endpoint, HostState, Timeouts};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

/// Bytes read per socket receive
pub(crate) const RECV_BUFFER_SIZE: usize = 1024;

/// Upper bound on a buffered HTTP response
const MAX_RESPONSE_SIZE: usize = 64 * 1024;

/// Common surface of the TCP and TLS probe clients
///
/// The probe state machine is written against this trait; only `connect`
/// differs between transports.
#[allow(async_fn_in_trait)]
pub trait ProbeClient {
    /// Establish the transport to the resolved address
    async fn connect(&mut self, endpoint: &Endpoint, addr: SocketAddr) -> NetResult<()>;

    /// Read once into `buf`; zero without error is EOF
    async fn recv(&mut self, buf: &mut [u8]) -> NetResult<usize>;

    /// Write the full payload
    async fn send(&mut self, data: &[u8]) -> NetResult<usize>;

    /// Write a request and read the full response
    async fn request(&mut self, request: &Request) -> NetResult<Response>;

    /// Best-effort ordered shutdown and close
    async fn disconnect(&mut self);

    /// State classification derived from the most recent error
    fn host_state(&self) -> HostState;

    /// Whether the transport is currently established
    fn is_connected(&self) -> bool;

    /// TLS session capture, when this client negotiated one
    fn tls_info(&self) -> Option<&TlsInfo>;
}

/// Plaintext TCP probe client
pub struct TcpClient {
    timeouts: Timeouts,
    endpoint: Option<Endpoint>,
    stream: Option<TcpStream>,
    connected: bool,
    state: HostState,
    last_error: Option<NetError>,
}

impl TcpClient {
    pub fn new(timeouts: Timeouts) -> Self {
        Self {
            timeouts,
            endpoint: None,
            stream: None,
            connected: false,
            state: HostState::Unknown,
            last_error: None,
        }
    }

    /// Most recent error recorded on this client
    pub fn last_error(&self) -> Option<&NetError> {
        self.last_error.as_ref()
    }

    fn port(&self) -> u16 {
        self.endpoint.as_ref().map(|ep| ep.port).unwrap_or_default()
    }

    /// Record an error and fold it into the host state
    ///
    /// A malformed HTTP response marks the response invalid without
    /// touching the transport-derived state.
    fn record(&mut self, err: NetError) -> NetError {
        if !matches!(err, NetError::HttpMalformed { .. }) {
            self.state = err.host_state(self.connected);
        }
        trace!("{}", err);
        self.last_error = Some(err.clone());
        err
    }
}

impl ProbeClient for TcpClient {
    async fn connect(&mut self, endpoint: &Endpoint, addr: SocketAddr) -> NetResult<()> {
        self.endpoint = Some(endpoint.clone());

        match timeout(self.timeouts.connect, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                debug!("Connection established: {}/tcp", endpoint.port);
                self.stream = Some(stream);
                self.connected = true;
                self.state = HostState::Open;
                Ok(())
            }
            Ok(Err(err)) => Err(self.record(NetError::from_io(&err, endpoint.port, false))),
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

        match read_chunk(stream, buf, recv_timeout, port, false).await {
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

        match write_payload(stream, data, send_timeout, port, false).await {
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

        match http_exchange(stream, request, &timeouts, port, false).await {
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
        None
    }
}

/// Write the full payload within the send deadline
pub(crate) async fn write_payload<S>(
    stream: &mut S,
    data: &[u8],
    deadline: std::time::Duration,
    port: u16,
    tls: bool,
) -> NetResult<usize>
where
    S: AsyncWrite + Unpin,
{
    match timeout(deadline, stream.write_all(data)).await {
        Ok(Ok(())) => Ok(data.len()),
        Ok(Err(err)) => Err(NetError::from_io(&err, port, tls)),
        Err(_elapsed) => Err(NetError::Timeout { port }),
    }
}

/// Read one chunk within the recv deadline; zero bytes is EOF
pub(crate) async fn read_chunk<S>(
    stream: &mut S,
    buf: &mut [u8],
    deadline: std::time::Duration,
    port: u16,
    tls: bool,
) -> NetResult<usize>
where
    S: AsyncRead + Unpin,
{
    match timeout(deadline, stream.read(buf)).await {
        Ok(Ok(count)) => Ok(count),
        Ok(Err(err)) => Err(NetError::from_io(&err, port, tls)),
        Err(_elapsed) => Err(NetError::Timeout { port }),
    }
}

/// Write a request, then read and parse the complete response
///
/// The response is read to EOF (the probe request always carries
/// `Connection: close`). A timeout, plain EOF, or TLS truncation after
/// bytes have arrived ends the read without failing the exchange.
pub(crate) async fn http_exchange<S>(
    stream: &mut S,
    request: &Request,
    timeouts: &Timeouts,
    port: u16,
    tls: bool,
) -> NetResult<Response>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_payload(stream, &request.serialize(), timeouts.send, port, tls).await?;

    let mut raw: Vec<u8> = Vec::new();
    let mut buf = [0u8; RECV_BUFFER_SIZE];

    loop {
        match read_chunk(stream, &mut buf, timeouts.recv, port, tls).await {
            Ok(0) => break,
            Ok(count) => {
                raw.extend_from_slice(&buf[..count]);
                if raw.len() >= MAX_RESPONSE_SIZE {
                    break;
                }
            }
            Err(err) if !raw.is_empty() => {
                // End-of-stream variants are fine once data has arrived
                if err.is_recoverable_eof() || matches!(err, NetError::Timeout { .. }) {
                    break;
                }
                return Err(err);
            }
            Err(err) => return Err(err),
        }
    }

    if raw.is_empty() {
        return Err(NetError::Eof { port });
    }

    Response::parse(&raw).map_err(|err| NetError::HttpMalformed {
        reason: err.to_string(),
    })
}
