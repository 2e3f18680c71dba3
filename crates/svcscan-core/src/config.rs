//! Scan configuration and argument record

use crate::error::{Error, Result};
use crate::http::valid_uri;
use crate::types::Endpoint;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default connect timeout in milliseconds
pub const CONNECT_TIMEOUT_MS: u64 = 3500;

/// Default receive timeout in milliseconds
pub const RECV_TIMEOUT_MS: u64 = 1000;

/// Default send timeout in milliseconds
pub const SEND_TIMEOUT_MS: u64 = 500;

/// Upper bound on worker threads accepted from the command line
pub const MAX_THREADS: usize = 32;

/// Per-operation network timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    /// Connect (and TLS handshake) deadline
    pub connect: Duration,
    /// Single receive deadline
    pub recv: Duration,
    /// Single send deadline
    pub send: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_millis(CONNECT_TIMEOUT_MS),
            recv: Duration::from_millis(RECV_TIMEOUT_MS),
            send: Duration::from_millis(SEND_TIMEOUT_MS),
        }
    }
}

/// Validated command-line argument record consumed by the scan engine
///
/// The CLI crate parses the raw arguments; the engine only ever sees this
/// record, shared read-only behind an `Arc` across probe tasks.
///
/// # Examples
///
/// ```
/// use svcscan_core::Args;
///
/// let args = Args::new("127.0.0.1", vec![80, 443]);
/// assert!(args.validate().is_ok());
/// assert!(args.pool_size() >= 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Args {
    /// Target hostname or IPv4 address
    pub target: String,
    /// Ports to scan, in input order
    pub ports: Vec<u16>,
    /// Verbose progress and per-port error output
    pub verbose: bool,
    /// Probe through a TLS-wrapped connection
    pub tls: bool,
    /// Emit the JSON report instead of the text table
    pub json: bool,
    /// Send GET instead of HEAD for plaintext HTTP probes
    pub curl: bool,
    /// URI used by HTTP(S) probes
    pub uri: String,
    /// Worker thread count requested on the command line
    pub threads: usize,
    /// Per-operation network timeouts
    pub timeouts: Timeouts,
    /// Report output file path
    pub out_path: Option<PathBuf>,
    /// Path of the running executable, for the JSON report
    pub executable: String,
    /// Raw command-line arguments, for the JSON report
    pub argv: Vec<String>,
}

impl Args {
    /// Create an argument record with defaults for everything but the
    /// target and port list
    pub fn new<S: Into<String>>(target: S, ports: Vec<u16>) -> Self {
        Self {
            target: target.into(),
            ports,
            verbose: false,
            tls: false,
            json: false,
            curl: false,
            uri: "/".to_string(),
            threads: 1,
            timeouts: Timeouts::default(),
            out_path: None,
            executable: String::new(),
            argv: Vec::new(),
        }
    }

    /// Override the connect timeout, leaving recv/send at their defaults
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connect = timeout;
        self
    }

    /// Validate the record before a scan may begin
    ///
    /// # Errors
    ///
    /// `InvalidTarget` for a malformed target, `InvalidPortRange` for an
    /// empty port list, and `InvalidArgument` for a bad URI or thread
    /// count.
    pub fn validate(&self) -> Result<()> {
        if self.ports.is_empty() {
            return Err(Error::InvalidPortRange(
                "no ports were specified".to_string(),
            ));
        }

        let probe = Endpoint::new(self.target.clone(), self.ports[0]);
        if !probe.is_valid() {
            return Err(Error::InvalidTarget(self.target.clone()));
        }

        if self.threads == 0 || self.threads > MAX_THREADS {
            return Err(Error::InvalidArgument(format!(
                "thread count must be between 1 and {}",
                MAX_THREADS
            )));
        }

        if !valid_uri(&self.uri) {
            return Err(Error::InvalidArgument(format!(
                "invalid HTTP URI: '{}'",
                self.uri
            )));
        }

        Ok(())
    }

    /// Worker pool size for this scan
    ///
    /// The larger of the machine-derived default (CPU count capped at 16)
    /// and the requested thread count clamped to `[1, MAX_THREADS]`.
    pub fn pool_size(&self) -> usize {
        let machine = num_cpus::get().min(16);
        machine.max(self.threads.clamp(1, MAX_THREADS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::new("127.0.0.1", vec![80]);
        assert_eq!(args.uri, "/");
        assert!(!args.tls);
        assert!(!args.curl);
        assert_eq!(args.timeouts, Timeouts::default());
        assert_eq!(args.timeouts.connect, Duration::from_millis(3500));
        assert_eq!(args.timeouts.recv, Duration::from_millis(1000));
        assert_eq!(args.timeouts.send, Duration::from_millis(500));
    }

    #[test]
    fn test_args_validate_ok() {
        assert!(Args::new("127.0.0.1", vec![22, 80]).validate().is_ok());
        assert!(Args::new("scanme.example.com", vec![443]).validate().is_ok());
    }

    #[test]
    fn test_args_validate_empty_ports() {
        let args = Args::new("127.0.0.1", vec![]);
        assert!(matches!(
            args.validate(),
            Err(Error::InvalidPortRange(_))
        ));
    }

    #[test]
    fn test_args_validate_bad_target() {
        let args = Args::new("300.1.2.3", vec![80]);
        assert!(matches!(args.validate(), Err(Error::InvalidTarget(_))));
    }

    #[test]
    fn test_args_validate_bad_uri() {
        let mut args = Args::new("127.0.0.1", vec![80]);
        args.uri = "not a uri".to_string();
        assert!(matches!(args.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_args_validate_bad_threads() {
        let mut args = Args::new("127.0.0.1", vec![80]);
        args.threads = 0;
        assert!(args.validate().is_err());

        args.threads = MAX_THREADS + 1;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_pool_size_respects_thread_request() {
        let mut args = Args::new("127.0.0.1", vec![80]);
        args.threads = 32;
        assert_eq!(args.pool_size(), 32);

        // A minimal request still yields at least one worker
        args.threads = 1;
        assert!(args.pool_size() >= 1);
        assert!(args.pool_size() <= 32);
    }

    #[test]
    fn test_connect_timeout_override() {
        let args =
            Args::new("127.0.0.1", vec![80]).with_connect_timeout(Duration::from_millis(250));
        assert_eq!(args.timeouts.connect, Duration::from_millis(250));
        assert_eq!(args.timeouts.recv, Duration::from_millis(1000));
    }
}
