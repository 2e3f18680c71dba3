//! CLI argument parsing

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use svcscan_core::{Args, Error, PortRange, Result};

/// SvcScan - Network service scanner
///
/// Probes TCP ports for reachability, captures connect banners, probes
/// plaintext or TLS-wrapped HTTP servers, and reports well-known service
/// details from an embedded registry.
#[derive(Parser, Debug)]
#[command(
    name = "svcscan",
    version,
    about = "Concurrent TCP and HTTP(S) network service scanner",
    after_help = "EXAMPLES:\n\
    # Scan two ports on a local address\n\
    svcscan 127.0.0.1 22,80\n\n\
    # Scan a port range with verbose diagnostics\n\
    svcscan -v -p 20-25 example.com\n\n\
    # TLS probe with a JSON report written to disk\n\
    svcscan --ssl --json -o scan.json example.com 443\n\n\
    # GET probe against a custom URI\n\
    svcscan --curl /health example.com 8080",
    author = "SvcScan Contributors"
)]
pub struct Cli {
    /// Target hostname or IPv4 address
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Ports to scan: comma-separated, N-M ranges allowed
    #[arg(value_name = "PORTS")]
    pub ports: Option<String>,

    /// Ports to scan (alternative to the positional list)
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    pub port: Option<String>,

    /// Verbose progress and per-port error output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Probe through TLS-wrapped connections
    #[arg(short = 's', long = "ssl")]
    pub ssl: bool,

    /// Emit the JSON report instead of the text table
    #[arg(short = 'j', long = "json")]
    pub json: bool,

    /// Connect timeout in milliseconds
    #[arg(short = 't', long = "timeout", value_name = "MS")]
    pub timeout: Option<u64>,

    /// Worker thread count (1-32)
    #[arg(short = 'T', long = "threads", value_name = "NUM", default_value = "1")]
    pub threads: usize,

    /// Write the report to the given file
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Use GET for HTTP probes, optionally against a custom URI
    #[arg(
        short = 'c',
        long = "curl",
        value_name = "URI",
        num_args = 0..=1,
        default_missing_value = "/"
    )]
    pub curl: Option<String>,
}

impl Cli {
    /// Convert the parsed command line into the engine's argument record
    pub fn to_args(&self) -> Result<Args> {
        let port_spec = self
            .port
            .as_deref()
            .or(self.ports.as_deref())
            .ok_or_else(|| Error::InvalidPortRange("no ports were specified".to_string()))?;

        let ports: Vec<u16> = PortRange::parse(port_spec)?.iter().collect();

        let mut args = Args::new(self.target.clone(), ports);
        args.verbose = self.verbose;
        args.tls = self.ssl;
        args.json = self.json;
        args.threads = self.threads;
        args.out_path = self.output.clone();

        if let Some(ms) = self.timeout {
            args = args.with_connect_timeout(Duration::from_millis(ms));
        }

        if let Some(uri) = &self.curl {
            args.curl = true;
            args.uri = uri.clone();
        }

        args.executable = std::env::current_exe()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "svcscan".to_string());
        args.argv = std::env::args().collect();

        args.validate()?;
        Ok(args)
    }
}
