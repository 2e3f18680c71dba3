//! Core types for network service scanning

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote connection endpoint: an address paired with a port
///
/// The address is either a dotted-quad IPv4 literal or a hostname left for
/// the resolver to handle. IPv6 targets are not supported.
///
/// # Examples
///
/// ```
/// use svcscan_core::Endpoint;
///
/// let ep = Endpoint::new("127.0.0.1", 80);
/// assert!(ep.is_valid());
/// assert_eq!(ep.to_string(), "127.0.0.1:80");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Hostname or IPv4 address
    pub addr: String,
    /// Port number
    pub port: u16,
}

impl Endpoint {
    /// Create a new endpoint from an address and port
    pub fn new<S: Into<String>>(addr: S, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
        }
    }

    /// Determine whether this endpoint can be scanned
    ///
    /// The port must be nonzero. An address in dotted-quad format must be a
    /// well-formed IPv4 literal; anything else is assumed to be a hostname
    /// and validated later by name resolution.
    pub fn is_valid(&self) -> bool {
        if self.port == 0 || self.addr.is_empty() {
            return false;
        }

        if looks_like_ipv4(&self.addr) {
            self.addr.parse::<std::net::Ipv4Addr>().is_ok()
        } else {
            true
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

/// Check for dotted-quad shape: four dot-separated integral octets
fn looks_like_ipv4(addr: &str) -> bool {
    let octets: Vec<&str> = addr.split('.').collect();
    octets.len() == 4
        && octets
            .iter()
            .all(|o| !o.is_empty() && o.chars().all(|c| c.is_ascii_digit()))
}

/// Reachability classification of a scanned port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostState {
    /// State could not be determined (timeout or unexpected error)
    #[default]
    Unknown,
    /// Connection refused before the handshake completed
    Closed,
    /// TCP handshake completed
    Open,
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostState::Open => write!(f, "open"),
            HostState::Closed => write!(f, "closed"),
            HostState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Execution status of a single probe task
///
/// Transitions are monotonic: `NotStarted` to `Executing` to `Complete`,
/// never backwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Task has been posted but not yet picked up by a worker
    #[default]
    NotStarted,
    /// Task is running on a worker
    Executing,
    /// Task finished and published its result
    Complete,
}

/// Port range specification
///
/// # Examples
///
/// ```
/// use svcscan_core::PortRange;
///
/// let ports = PortRange::parse("22-24,80,443").unwrap();
/// assert_eq!(ports.count(), 5);
/// assert_eq!(ports.iter().collect::<Vec<_>>(), vec![22, 23, 24, 80, 443]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortRange {
    /// Single port
    Single(u16),
    /// Range of ports (inclusive)
    Range(u16, u16),
    /// List of individual ports and ranges
    List(Vec<PortRange>),
}

impl PortRange {
    /// Parse a port specification: "80", "22-24", "80,443,8080", "1-100,443"
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(Error::InvalidPortRange(
                "empty port specification".to_string(),
            ));
        }

        if input.contains(',') {
            let parts: Result<Vec<PortRange>> = input
                .split(',')
                .map(|s| PortRange::parse(s.trim()))
                .collect();
            return Ok(PortRange::List(parts?));
        }

        if input.contains('-') {
            let parts: Vec<&str> = input.split('-').collect();
            if parts.len() != 2 {
                return Err(Error::InvalidPortRange(format!(
                    "invalid range format: {}",
                    input
                )));
            }

            let start = parse_port(parts[0])?;
            let end = parse_port(parts[1])?;

            if end < start {
                return Err(Error::InvalidPortRange(format!(
                    "end port {} < start port {}",
                    end, start
                )));
            }

            return Ok(PortRange::Range(start, end));
        }

        Ok(PortRange::Single(parse_port(input)?))
    }

    /// Flatten into the ordered list of ports
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        let mut ports = Vec::with_capacity(self.count());
        self.collect_into(&mut ports);
        ports.into_iter()
    }

    fn collect_into(&self, ports: &mut Vec<u16>) {
        match self {
            PortRange::Single(port) => ports.push(*port),
            PortRange::Range(start, end) => ports.extend(*start..=*end),
            PortRange::List(ranges) => {
                for range in ranges {
                    range.collect_into(ports);
                }
            }
        }
    }

    /// Count total ports in this specification
    pub fn count(&self) -> usize {
        match self {
            PortRange::Single(_) => 1,
            PortRange::Range(start, end) => *end as usize - *start as usize + 1,
            PortRange::List(ranges) => ranges.iter().map(|r| r.count()).sum(),
        }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortRange::Single(port) => write!(f, "{}", port),
            PortRange::Range(start, end) => write!(f, "{}-{}", start, end),
            PortRange::List(ranges) => {
                let parts: Vec<String> = ranges.iter().map(|r| r.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

fn parse_port(input: &str) -> Result<u16> {
    let port: u16 = input
        .trim()
        .parse()
        .map_err(|_| Error::InvalidPortRange(format!("invalid port number: {}", input)))?;

    if port == 0 {
        return Err(Error::InvalidPortRange("port 0 is invalid".to_string()));
    }
    Ok(port)
}
