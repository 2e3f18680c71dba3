//! Per-connection error types
//!
//! Every network failure inside a probe task is local: it is folded into
//! that port's `ServiceInfo` through the host-state table and never
//! propagated to sibling tasks. Only target resolution failures escape the
//! engine, as `svcscan_core::Error`.

use std::io;
use svcscan_core::HostState;
use thiserror::Error;

/// Result type alias for probe-level network operations
pub type NetResult<T> = std::result::Result<T, NetError>;

/// Classified network error raised by a probe client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetError {
    /// Remote end refused the connection
    #[error("Connection refused: {port}/tcp")]
    ConnectRefused { port: u16 },

    /// Name resolution failed for the target host
    #[error("Unable to resolve hostname: '{addr}'")]
    HostNotFound { addr: String },

    /// Operation exceeded its deadline
    #[error("Connection timeout: {port}/tcp")]
    Timeout { port: u16 },

    /// TLS peer closed without a proper `close_notify`
    #[error("The TLS stream was forcibly closed: {port}/tcp")]
    TlsTruncated { port: u16 },

    /// Plain end of stream with no data
    #[error("End of stream: {port}/tcp")]
    Eof { port: u16 },

    /// Response bytes did not parse as an HTTP message
    #[error("Malformed HTTP response: {reason}")]
    HttpMalformed { reason: String },

    /// Anything else
    #[error("{reason}")]
    Other { reason: String },
}

impl NetError {
    /// Classify an I/O error raised while talking to `port`
    ///
    /// `tls` maps an unexpected EOF to the TLS truncation case instead of
    /// a plain end-of-stream.
    pub fn from_io(err: &io::Error, port: u16, tls: bool) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => NetError::ConnectRefused { port },
            io::ErrorKind::TimedOut => NetError::Timeout { port },
            io::ErrorKind::UnexpectedEof if tls => NetError::TlsTruncated { port },
            io::ErrorKind::UnexpectedEof => NetError::Eof { port },
            _ => NetError::Other {
                reason: format!("{}: {}/tcp", err, port),
            },
        }
    }

    /// Host-state classification for this error
    ///
    /// `connected` reflects whether the TCP handshake (and TLS handshake,
    /// for a TLS client) had already completed when the error occurred:
    ///
    /// | Error                       | not yet connected | was connected |
    /// |-----------------------------|-------------------|---------------|
    /// | refused / host not found    | closed            | open          |
    /// | timeout                     | unknown           | open          |
    /// | TLS stream truncated        | closed            | open          |
    /// | EOF                         | unknown           | open          |
    /// | anything else               | unknown           | unknown       |
    pub fn host_state(&self, connected: bool) -> HostState {
        match self {
            NetError::ConnectRefused { .. } | NetError::HostNotFound { .. } => {
                if connected {
                    HostState::Open
                } else {
                    HostState::Closed
                }
            }
            NetError::Timeout { .. } => {
                if connected {
                    HostState::Open
                } else {
                    HostState::Unknown
                }
            }
            NetError::TlsTruncated { .. } => {
                if connected {
                    HostState::Open
                } else {
                    HostState::Closed
                }
            }
            NetError::Eof { .. } => {
                if connected {
                    HostState::Open
                } else {
                    HostState::Unknown
                }
            }
            NetError::HttpMalformed { .. } | NetError::Other { .. } => HostState::Unknown,
        }
    }

    /// Whether this error marks an acceptable end of stream when data was
    /// already received
    pub fn is_recoverable_eof(&self) -> bool {
        matches!(
            self,
            NetError::Eof { .. } | NetError::TlsTruncated { .. }
        )
    }
}
