//! SvcScan Core Library
//!
//! This crate provides the shared types for the SvcScan network service
//! scanner: the argument record and validation, the embedded well-known
//! port registry, the HTTP/1.1 message model used by probes, per-port
//! service records, progress tracking, and report assembly.
//!
//! # Examples
//!
//! ```
//! use svcscan_core::{Args, PortRange, PortRegistry};
//!
//! // Parse port ranges
//! let ports = PortRange::parse("22-24,80").unwrap();
//! assert_eq!(ports.count(), 4);
//!
//! // Validate a scan configuration
//! let args = Args::new("127.0.0.1", ports.iter().collect());
//! assert!(args.validate().is_ok());
//!
//! // Look up a well-known service
//! let registry = PortRegistry::load().unwrap();
//! assert_eq!(registry.lookup(80).unwrap().service, "http");
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod progress;
pub mod registry;
pub mod report;
pub mod svc_info;
pub mod types;

// Re-export commonly used types
pub use config::{Args, Timeouts, CONNECT_TIMEOUT_MS, RECV_TIMEOUT_MS, SEND_TIMEOUT_MS};
pub use error::{Error, Result};
pub use http::{HeaderMap, HttpError, HttpVersion, Method, Request, Response};
pub use progress::{ScanProgress, Timer};
pub use registry::{PortRegistry, ServiceRecord};
pub use report::{json_report, render_json, ScanReport, SvcTable, APP_NAME, REPO};
pub use svc_info::ServiceInfo;
pub use types::{Endpoint, HostState, PortRange, TaskStatus};
