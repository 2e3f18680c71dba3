//! Per-port service information record
//!
//! A `ServiceInfo` is created empty when a probe task starts, mutated only
//! by that task, and published into the engine's service list when the task
//! completes. The banner grammar and registry fallback follow the embedded
//! IANA-style table semantics.

use crate::http::{Request, Response};
use crate::registry::PortRegistry;
use crate::types::{Endpoint, HostState};

/// Longest banner fragment kept as a service summary before abbreviation
const SUMMARY_LEN: usize = 35;

/// Aggregated result of probing one port
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceInfo {
    /// Target address the probe connected to
    pub addr: String,
    /// Probed port
    pub port: u16,
    /// Transport protocol
    pub proto: String,
    /// Reachability classification
    pub state: HostState,
    /// First non-empty bytes the peer emitted, trimmed at the last EOL
    pub banner: String,
    /// Service name, from the banner, an HTTP probe, or the registry
    pub service: String,
    /// Service summary text
    pub summary: String,
    /// Negotiated TLS cipher suite, when a handshake succeeded
    pub cipher: String,
    /// Peer certificate issuer, when one was visible
    pub issuer: String,
    /// Peer certificate subject, when one was visible
    pub subject: String,
    /// HTTP request sent by a successful probe
    pub request: Option<Request>,
    /// HTTP response received by a successful probe
    pub response: Option<Response>,
}

impl ServiceInfo {
    /// Create an empty record for the given endpoint
    pub fn new(endpoint: &Endpoint) -> Self {
        Self {
            addr: endpoint.addr.clone(),
            port: endpoint.port,
            proto: "tcp".to_string(),
            ..Self::default()
        }
    }

    /// Parse a raw socket banner into service fields
    ///
    /// The banner is trimmed at its last EOL. A banner carrying at least
    /// two `-` separators is split into service, protocol, and summary
    /// segments (`SSH-2.0-OpenSSH_9.0` becomes service `ssh (2.0)`,
    /// summary `OpenSSH 9.0`); anything else is recorded verbatim with the
    /// service left unclassified.
    pub fn parse_banner(&mut self, data: &str) {
        if data.is_empty() {
            return;
        }

        self.state = HostState::Open;
        self.banner = upto_last_eol(data);

        if self.banner.matches('-').count() < 2 {
            self.service = "unknown".to_string();
            self.summary = shrink(&self.banner, SUMMARY_LEN);
            return;
        }

        let segments: Vec<&str> = self.banner.splitn(3, '-').collect();

        for (idx, segment) in segments.iter().enumerate() {
            match idx {
                // Service name
                0 => self.service = segment.to_ascii_lowercase(),
                // Protocol version
                1 => {
                    self.proto = segment.to_ascii_lowercase();
                    self.service = format!("{} ({})", self.service, self.proto);
                }
                // Service summary
                _ => self.summary = segment.replace('_', " "),
            }
        }
    }

    /// Record a successful HTTP(S) probe exchange
    ///
    /// The service becomes `http (<version>)` (renamed to `https` for a
    /// TLS probe) and the summary is taken from the response's `Server`
    /// header with `_` and `/` flattened to spaces.
    pub fn set_http(&mut self, request: Request, response: Response, tls: bool) {
        self.state = HostState::Open;
        self.service = format!("http ({})", response.version.num_str());
        self.summary = response.server().replace(['_', '/'], " ");

        if tls {
            self.service = self.service.replacen("http", "https", 1);
        }

        self.request = Some(request);
        self.response = Some(response);
    }

    /// Finalize the record: assign the probe's terminal state and fall
    /// back to the registry for still-unclassified services
    ///
    /// A banner-derived summary survives classification; only the
    /// protocol and service name are filled in around it.
    pub fn classify(&mut self, registry: &PortRegistry, state: HostState) {
        self.state = state;

        let keep_summary = !self.summary.is_empty() && self.service == "unknown";

        if self.service.is_empty() || keep_summary {
            match registry.lookup(self.port) {
                Some(record) => {
                    self.proto = record.proto.clone();
                    self.service = record.service.clone();
                    if !keep_summary {
                        self.summary = record.summary.clone();
                    }
                }
                None => {
                    if self.service.is_empty() {
                        self.service = "unknown".to_string();
                    }
                }
            }
        }
    }
}

/// Truncate to `len` characters, marking the cut with a trailing `...`
fn shrink(data: &str, len: usize) -> String {
    if data.chars().count() > len {
        let cut: String = data.chars().take(len).collect();
        format!("{}...", cut)
    } else {
        data.to_string()
    }
}

/// Take the input up to (excluding) its last EOL sequence
///
/// CRLF is preferred over bare LF; input without any EOL is dropped
/// entirely, matching a banner that never completed a line.
fn upto_last_eol(data: &str) -> String {
    if let Some(idx) = data.rfind("\r\n") {
        data[..idx].to_string()
    } else if let Some(idx) = data.rfind('\n') {
        data[..idx].to_string()
    } else {
        String::new()
    }
}
