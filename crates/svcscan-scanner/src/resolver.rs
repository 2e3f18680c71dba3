//! Forward IPv4 name resolution
//!
//! Wraps the runtime's resolver with bounded retries. Only IPv4 results
//! are surfaced; IPv6-only hosts resolve to nothing and report as
//! host-not-found.

use crate::error::{NetError, NetResult};
use std::net::SocketAddr;
use std::time::Duration;
use svcscan_core::Endpoint;
use tokio::net::lookup_host;
use tokio::time::timeout;
use tracing::{debug, trace};

/// Deadline for a single resolution attempt
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolve an endpoint to its IPv4 socket addresses
///
/// Transient failures are retried up to `retries` additional times; the
/// first successful attempt wins.
///
/// # Errors
///
/// `HostNotFound` when the name does not resolve to any IPv4 address,
/// `Timeout` when every attempt exceeded its deadline, `Other` for
/// resolver failures that are neither.
pub async fn resolve(endpoint: &Endpoint, retries: u32) -> NetResult<Vec<SocketAddr>> {
    let query = format!("{}:{}", endpoint.addr, endpoint.port);
    let mut last_err = NetError::HostNotFound {
        addr: endpoint.addr.clone(),
    };

    for attempt in 0..=retries {
        if attempt > 0 {
            trace!("Resolution retry {} for {}", attempt, endpoint.addr);
        }

        match timeout(RESOLVE_TIMEOUT, lookup_host(query.as_str())).await {
            Ok(Ok(addrs)) => {
                let v4: Vec<SocketAddr> = addrs.filter(SocketAddr::is_ipv4).collect();

                if v4.is_empty() {
                    last_err = NetError::HostNotFound {
                        addr: endpoint.addr.clone(),
                    };
                    continue;
                }

                debug!("Resolved {} to {}", endpoint.addr, v4[0].ip());
                return Ok(v4);
            }
            Ok(Err(err)) => {
                last_err = match err.kind() {
                    std::io::ErrorKind::TimedOut => NetError::Timeout {
                        port: endpoint.port,
                    },
                    // Platform resolvers report unknown names inconsistently
                    _ => NetError::HostNotFound {
                        addr: endpoint.addr.clone(),
                    },
                };
            }
            Err(_elapsed) => {
                last_err = NetError::Timeout {
                    port: endpoint.port,
                };
            }
        }
    }

    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_ipv4_literal() {
        let addrs = resolve(&Endpoint::new("127.0.0.1", 80), 0).await.unwrap();
        assert_eq!(addrs.len(), 1);
        assert_eq!(addrs[0], "127.0.0.1:80".parse().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_localhost() {
        let addrs = resolve(&Endpoint::new("localhost", 22), 1).await.unwrap();
        assert!(addrs.iter().all(SocketAddr::is_ipv4));
        assert!(addrs.iter().all(|a| a.port() == 22));
    }

    #[tokio::test]
    async fn test_resolve_unknown_host() {
        let result = resolve(&Endpoint::new("does-not-exist.invalid", 80), 1).await;
        assert!(matches!(
            result,
            Err(NetError::HostNotFound { .. }) | Err(NetError::Timeout { .. })
        ));
    }
}
