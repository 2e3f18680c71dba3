//! Scan engine
//!
//! Owns everything one scan needs: the validated argument record, the port
//! registry, the worker pool, and the shared result state probe tasks
//! write into. Tasks are independent; a failing probe records its outcome
//! and never disturbs its siblings. Only an invalid configuration, an
//! unresolvable target, or a broken registry abort a scan.

use crate::probe::probe_port;
use crate::resolver;
use colored::Colorize;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io::Write;
use std::net::IpAddr;
use std::sync::Arc;
use svcscan_core::{
    Args, Endpoint, Error, PortRegistry, Result, ScanProgress, ScanReport, ServiceInfo, SvcTable,
    TaskStatus, Timer,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Additional resolution attempts before giving up on the target
const DNS_RETRIES: u32 = 1;

/// Stream lock so multi-task diagnostics stay atomic per line
static STDERR_LOCK: Mutex<()> = Mutex::new(());

/// Concurrent TCP/HTTP(S) scan engine
///
/// # Examples
///
/// ```no_run
/// use svcscan_core::Args;
/// use svcscan_scanner::ScanEngine;
///
/// # async fn example() -> svcscan_core::Result<()> {
/// let args = Args::new("127.0.0.1", vec![22, 80, 443]);
/// let mut engine = ScanEngine::new(args)?;
/// let report = engine.scan().await?;
/// println!("{}", report.render_table(false));
/// # Ok(())
/// # }
/// ```
pub struct ScanEngine {
    args: Arc<Args>,
    registry: Arc<PortRegistry>,
    pool_size: usize,
    colorize: bool,
    progress: Arc<ScanProgress>,
    services: Arc<Mutex<Vec<ServiceInfo>>>,
    statuses: Arc<Mutex<BTreeMap<u16, TaskStatus>>>,
    timer: Timer,
    tasks: JoinSet<()>,
    cancel: CancellationToken,
}

impl ScanEngine {
    /// Create an engine for the given arguments
    ///
    /// Validates the arguments, loads the embedded registry, and sizes the
    /// worker pool.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` / `InvalidTarget` / `InvalidPortRange` from
    /// validation, `ResourceUnavailable` when the registry cannot load.
    pub fn new(args: Args) -> Result<Self> {
        args.validate()?;

        let registry = PortRegistry::load()?;
        let pool_size = args.pool_size();

        let statuses: BTreeMap<u16, TaskStatus> = args
            .ports
            .iter()
            .map(|&port| (port, TaskStatus::NotStarted))
            .collect();

        let progress = Arc::new(ScanProgress::new(args.ports.len()));

        debug!(
            "Engine ready: {} port(s), pool size {}",
            args.ports.len(),
            pool_size
        );

        Ok(Self {
            args: Arc::new(args),
            registry: Arc::new(registry),
            pool_size,
            colorize: false,
            progress,
            services: Arc::new(Mutex::new(Vec::new())),
            statuses: Arc::new(Mutex::new(statuses)),
            timer: Timer::new(),
            tasks: JoinSet::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Enable colored verbose diagnostics
    pub fn with_colorize(mut self, colorize: bool) -> Self {
        self.colorize = colorize;
        self
    }

    /// Token that cancels the whole scan
    ///
    /// Cancellation halts dispatch of further probe tasks; in-flight tasks
    /// run to completion under their own timeouts.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Shared progress counters, for an external progress reporter
    pub fn progress(&self) -> Arc<ScanProgress> {
        Arc::clone(&self.progress)
    }

    /// Argument record this engine was built from
    pub fn args(&self) -> &Args {
        &self.args
    }

    /// Execution status of every probe task, keyed by port
    pub fn statuses(&self) -> BTreeMap<u16, TaskStatus> {
        self.statuses.lock().clone()
    }

    /// Run the complete scan: resolve the target, post one probe task per
    /// port, drain the pool, and assemble the report
    pub async fn scan(&mut self) -> Result<ScanReport> {
        let target_ip = self.resolve_target().await?;

        info!(
            "Scanning {} ({}) on {} port(s)",
            self.args.target,
            target_ip,
            self.args.ports.len()
        );

        self.timer.start();

        let semaphore = Arc::new(Semaphore::new(self.pool_size));
        let ports = self.args.ports.clone();

        for port in ports {
            if self.cancel.is_cancelled() {
                debug!("Scan cancelled; halting dispatch");
                break;
            }

            let permit = semaphore.clone().acquire_owned().await.map_err(|e| {
                Error::Io(std::io::Error::other(format!("worker pool closed: {}", e)))
            })?;

            let args = Arc::clone(&self.args);
            let registry = Arc::clone(&self.registry);
            let services = Arc::clone(&self.services);
            let statuses = Arc::clone(&self.statuses);
            let progress = Arc::clone(&self.progress);
            let colorize = self.colorize;

            self.tasks.spawn(async move {
                statuses.lock().insert(port, TaskStatus::Executing);

                let endpoint = Endpoint::new(args.target.clone(), port);
                let addr = std::net::SocketAddr::new(target_ip, port);

                let (service_info, probe_err) =
                    probe_port(&endpoint, addr, &args, &registry).await;

                if args.verbose {
                    if let Some(err) = probe_err {
                        print_diagnostic(&endpoint, &err, colorize);
                    }
                }

                services.lock().push(service_info);
                statuses.lock().insert(port, TaskStatus::Complete);
                progress.increment_completed();

                drop(permit);
            });
        }

        self.wait().await;
        self.timer.stop();

        let services = self.services.lock().clone();
        let table = SvcTable::new(self.args.target.clone(), services);

        Ok(ScanReport::new(
            table,
            (*self.args).clone(),
            self.timer.clone(),
        ))
    }

    /// Block until every outstanding probe task has completed
    pub async fn wait(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(err) = result {
                debug!("Probe task join error: {}", err);
            }
        }
    }

    /// Resolve the scan target to a single IPv4 address
    async fn resolve_target(&self) -> Result<IpAddr> {
        let endpoint = Endpoint::new(self.args.target.clone(), self.args.ports[0]);

        let addrs = resolver::resolve(&endpoint, DNS_RETRIES)
            .await
            .map_err(|_| Error::TargetUnresolvable(self.args.target.clone()))?;

        Ok(addrs[0].ip())
    }
}

/// Print a one-line colored diagnostic for a local probe failure
fn print_diagnostic(endpoint: &Endpoint, err: &crate::error::NetError, colorize: bool) {
    let line = format!("[x] {}: {}", endpoint.addr, err);

    let _guard = STDERR_LOCK.lock();
    let mut stderr = std::io::stderr().lock();
    if colorize {
        let _ = writeln!(stderr, "{}", line.as_str().red());
    } else {
        let _ = writeln!(stderr, "{}", line);
    }
}
