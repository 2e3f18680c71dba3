//! SvcScan Scanner Library
//!
//! The scan engine and its collaborators: IPv4 name resolution, the TCP
//! and TLS probe clients sharing one probe surface, the per-port probe
//! state machine, and the worker pool that drives a full scan to a
//! report.
//!
//! # Examples
//!
//! ```no_run
//! use svcscan_core::Args;
//! use svcscan_scanner::ScanEngine;
//!
//! # async fn example() -> svcscan_core::Result<()> {
//! let mut engine = ScanEngine::new(Args::new("127.0.0.1", vec![22, 80]))?;
//! let report = engine.scan().await?;
//! println!("{}", report.render_table(false));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod engine;
pub mod error;
pub mod probe;
pub mod resolver;
pub mod tls;

// Re-export commonly used types
pub use client::{ProbeClient, TcpClient};
pub use engine::ScanEngine;
pub use error::{NetError, NetResult};
pub use probe::probe_port;
pub use resolver::resolve;
pub use tls::{TlsClient, TlsInfo};
