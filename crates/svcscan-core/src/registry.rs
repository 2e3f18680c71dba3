//! Embedded well-known port registry
//!
//! The registry is an IANA-style CSV blob compiled into the binary, one
//! record per port in ascending order: `port,proto,service,summary` with
//! optional double-quoting. It is parsed once at engine construction and
//! consulted read-only by every probe task.
//!
//! # Examples
//!
//! ```
//! use svcscan_core::PortRegistry;
//!
//! let registry = PortRegistry::load().unwrap();
//! let record = registry.lookup(22).unwrap();
//! assert_eq!(record.service, "ssh");
//! ```

use crate::error::{Error, Result};
use std::collections::HashMap;
use tracing::debug;

// Embedded at compile time; a build without it fails outright rather than
// at scan time.
const REGISTRY_CSV: &str = include_str!("../data/service-registry.csv");

/// One well-known service record from the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    /// Transport protocol, typically `tcp`
    pub proto: String,
    /// Well-known service name
    pub service: String,
    /// Human-readable service summary
    pub summary: String,
}

/// Read-only port-to-service lookup table
#[derive(Debug, Clone)]
pub struct PortRegistry {
    records: HashMap<u16, ServiceRecord>,
}

impl PortRegistry {
    /// Parse the embedded registry blob
    ///
    /// # Errors
    ///
    /// `ResourceUnavailable` when the blob is empty or malformed. A record
    /// whose port column disagrees with its line position is malformed:
    /// the blob is expected to list port `n` on line `n`.
    pub fn load() -> Result<Self> {
        Self::parse(REGISTRY_CSV)
    }

    /// Parse registry records from CSV text
    pub fn parse(blob: &str) -> Result<Self> {
        if blob.trim().is_empty() {
            return Err(Error::ResourceUnavailable(
                "embedded service registry is empty".to_string(),
            ));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(blob.as_bytes());

        let mut records = HashMap::new();

        for (line, row) in reader.records().enumerate() {
            let row = row?;

            let port: u16 = row
                .get(0)
                .and_then(|p| p.trim().parse().ok())
                .ok_or_else(|| {
                    Error::ResourceUnavailable(format!(
                        "registry line {} has no port field",
                        line + 1
                    ))
                })?;

            if port as usize != line + 1 {
                return Err(Error::ResourceUnavailable(format!(
                    "registry line {} describes port {}",
                    line + 1,
                    port
                )));
            }

            records.insert(
                port,
                ServiceRecord {
                    proto: row.get(1).unwrap_or("tcp").to_string(),
                    service: row.get(2).unwrap_or_default().to_string(),
                    summary: row.get(3).unwrap_or_default().to_string(),
                },
            );
        }

        debug!("Loaded {} registry records", records.len());

        Ok(Self { records })
    }

    /// Look up the well-known service record for a port
    ///
    /// Ports past the end of the embedded table yield `None`, never an
    /// error.
    pub fn lookup(&self, port: u16) -> Option<&ServiceRecord> {
        self.records.get(&port)
    }

    /// Number of records in the registry
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
