//! Console and file output for scan reports

use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::io::Write;
use svcscan_core::{Args, ScanReport, Timer, REPO};

/// Ports shown verbatim in the startup banner before abbreviating
const BANNER_PORT_LIMIT: usize = 7;

/// Startup banner printed before the first probe runs
pub fn startup_banner(args: &Args, started: chrono::DateTime<chrono::Utc>) -> String {
    let shown: Vec<String> = args
        .ports
        .iter()
        .take(BANNER_PORT_LIMIT)
        .map(|port| port.to_string())
        .collect();

    let mut ports = shown.join(", ");
    if args.ports.len() > BANNER_PORT_LIMIT {
        ports.push_str(&format!(
            " ... ({} not shown)",
            args.ports.len() - BANNER_PORT_LIMIT
        ));
    }

    format!(
        "Beginning SvcScan ({})\nTime: {}\nTarget: {}\nPorts: {}",
        REPO,
        Timer::timestamp(started),
        args.target,
        ports
    )
}

/// Print the end-of-scan summary and report to stdout
pub fn print_report(report: &ScanReport, colorize: bool) -> Result<()> {
    let mut stdout = std::io::stdout().lock();

    if report.args.json {
        writeln!(stdout, "{}", report.render_json()?)?;
        return Ok(());
    }

    writeln!(stdout)?;
    writeln!(stdout, "{}", report.summary())?;
    writeln!(stdout)?;
    writeln!(stdout, "{}", report.render_table(colorize))?;
    Ok(())
}

/// Persist the report to the configured output path
pub fn save_report(report: &ScanReport) -> Result<()> {
    let path = match &report.args.out_path {
        Some(path) => path,
        None => return Ok(()),
    };

    let contents = if report.args.json {
        report.render_json()?
    } else {
        report.render_text_report()
    };

    fs::write(path, contents)
        .with_context(|| format!("failed to write report to '{}'", path.display()))?;
    Ok(())
}

/// Print a fatal error line to stderr
pub fn print_fatal(message: &str, colorize: bool) {
    let line = format!("[x] {}", message);
    if colorize {
        eprintln!("{}", line.as_str().red().bold());
    } else {
        eprintln!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svcscan_core::SvcTable;

    #[test]
    fn test_banner_short_port_list() {
        let args = Args::new("127.0.0.1", vec![22, 80, 443]);
        let banner = startup_banner(&args, chrono::Utc::now());

        assert!(banner.starts_with(&format!("Beginning SvcScan ({})", REPO)));
        assert!(banner.contains("Target: 127.0.0.1"));
        assert!(banner.ends_with("Ports: 22, 80, 443"));
    }

    #[test]
    fn test_banner_abbreviates_long_port_list() {
        let args = Args::new("127.0.0.1", (1..=20).collect());
        let banner = startup_banner(&args, chrono::Utc::now());

        assert!(banner.contains("1, 2, 3, 4, 5, 6, 7 ... (13 not shown)"));
    }

    #[test]
    fn test_save_report_without_path_is_noop() {
        let report = ScanReport::new(
            SvcTable::new("127.0.0.1", Vec::new()),
            Args::new("127.0.0.1", vec![80]),
            Timer::new(),
        );
        assert!(save_report(&report).is_ok());
    }

    #[test]
    fn test_save_text_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.txt");

        let mut args = Args::new("127.0.0.1", vec![80]);
        args.out_path = Some(path.clone());

        let report = ScanReport::new(SvcTable::new("127.0.0.1", Vec::new()), args, Timer::new());
        save_report(&report).unwrap();

        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.starts_with("SvcScan ("));
        assert!(contents.contains("Target: 127.0.0.1"));
    }

    #[test]
    fn test_save_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");

        let mut args = Args::new("127.0.0.1", vec![80]);
        args.json = true;
        args.out_path = Some(path.clone());

        let report = ScanReport::new(SvcTable::new("127.0.0.1", Vec::new()), args, Timer::new());
        save_report(&report).unwrap();

        let contents = fs::read_to_string(path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(value["appInfo"]["name"], "SvcScan");
        assert!(value["scanSummary"]["reportPath"]
            .as_str()
            .unwrap()
            .ends_with("scan.json"));
    }
}
