//! SvcScan CLI
//!
//! Command-line interface for the SvcScan network service scanner.

mod args;
mod output;
mod progress;

use anyhow::Result;
use args::Cli;
use clap::error::ErrorKind;
use clap::Parser;
use progress::KeystrokeWatcher;
use std::io::IsTerminal;
use std::process::ExitCode;
use svcscan_core::Args;
use svcscan_scanner::ScanEngine;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version are successful exits
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
            let _ = err.print();
            return code;
        }
    };

    init_tracing(cli.verbose);
    let colorize = std::io::stdout().is_terminal();

    let scan_args = match cli.to_args() {
        Ok(scan_args) => scan_args,
        Err(err) => {
            output::print_fatal(&err.to_string(), colorize);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            output::print_fatal(&format!("failed to start runtime: {}", err), colorize);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run_scan(scan_args, colorize)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::print_fatal(&err.to_string(), colorize);
            ExitCode::FAILURE
        }
    }
}

async fn run_scan(scan_args: Args, colorize: bool) -> Result<()> {
    let mut engine = ScanEngine::new(scan_args)?.with_colorize(colorize);

    println!(
        "{}",
        output::startup_banner(engine.args(), chrono::Utc::now())
    );
    if engine.args().verbose {
        println!();
    }

    // Ctrl-C halts dispatch; in-flight probes finish under their timeouts
    let cancel = engine.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut watcher = KeystrokeWatcher::spawn(engine.progress());
    let report = engine.scan().await?;
    watcher.stop();

    debug!("Scan finished in {}", report.timer.elapsed_str());

    output::print_report(&report, colorize)?;
    output::save_report(&report)?;

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
