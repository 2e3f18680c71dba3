//! Scan report assembly
//!
//! Consumes the per-port `ServiceInfo` records accumulated by a scan and
//! produces the text table and the JSON document. Output is sorted by port
//! so reports are deterministic regardless of task completion order. The
//! caller decides whether the table is colorized; no process-wide terminal
//! state is consulted here.

use crate::config::Args;
use crate::progress::Timer;
use crate::svc_info::ServiceInfo;
use crate::types::HostState;
use colored::Colorize;
use serde_json::{json, Map, Value};

/// Application name stamped into every JSON report
pub const APP_NAME: &str = "SvcScan";

/// Upstream repository URL stamped into reports
pub const REPO: &str = "https://github.com/vandavey/SvcScan";

const COLUMN_SEP: &str = "   ";

/// Sorted service table for one scan target
#[derive(Debug, Clone)]
pub struct SvcTable {
    addr: String,
    services: Vec<ServiceInfo>,
}

impl SvcTable {
    /// Build a table from unordered scan results, sorting by port
    pub fn new<S: Into<String>>(addr: S, mut services: Vec<ServiceInfo>) -> Self {
        services.sort_by_key(|info| info.port);
        Self {
            addr: addr.into(),
            services,
        }
    }

    /// Target address the table describes
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Services in ascending port order
    pub fn services(&self) -> &[ServiceInfo] {
        &self.services
    }

    /// Render the table: a `Target:` title, an underline, a header row,
    /// and one padded row per service
    pub fn render(&self, colorize: bool) -> String {
        let mut rows: Vec<[String; 4]> = vec![[
            "PORT".to_string(),
            "SERVICE".to_string(),
            "STATE".to_string(),
            "INFO".to_string(),
        ]];

        for info in &self.services {
            rows.push([
                format!("{}/{}", info.port, info.proto),
                info.service.clone(),
                info.state.to_string(),
                info.summary.clone(),
            ]);
        }

        let widths: Vec<usize> = (0..4)
            .map(|col| rows.iter().map(|row| row[col].len()).max().unwrap_or(0))
            .collect();

        let title = format!("Target: {}", self.addr);
        let mut out = String::new();
        out.push_str(&title);
        out.push('\n');
        out.push_str(&"-".repeat(title.len()));
        out.push('\n');

        for (idx, row) in rows.iter().enumerate() {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(col, cell)| {
                    let padded = format!("{:<width$}", cell, width = widths[col]);
                    // Only the STATE column of data rows is colored
                    if colorize && col == 2 && idx > 0 {
                        colorize_state(&padded, self.services[idx - 1].state)
                    } else {
                        padded
                    }
                })
                .collect();

            out.push_str(cells.join(COLUMN_SEP).trim_end());
            out.push('\n');
        }

        out
    }
}

fn colorize_state(padded: &str, state: HostState) -> String {
    match state {
        HostState::Open => padded.green().to_string(),
        HostState::Closed => padded.red().to_string(),
        HostState::Unknown => padded.yellow().to_string(),
    }
}

/// Completed scan output: the sorted table plus the inputs needed to
/// render either report form
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub table: SvcTable,
    pub args: Args,
    pub timer: Timer,
}

impl ScanReport {
    pub fn new(table: SvcTable, args: Args, timer: Timer) -> Self {
        Self { table, args, timer }
    }

    /// Render the service table
    pub fn render_table(&self, colorize: bool) -> String {
        self.table.render(colorize)
    }

    /// Render the scan summary block shown after the table
    pub fn summary(&self) -> String {
        let mut out = String::from("Scan Summary\n");
        out.push_str(&format!("Duration   : {}\n", self.timer.elapsed_str()));
        out.push_str(&format!(
            "Start Time : {}\n",
            self.timer.beg_time().map(Timer::timestamp).unwrap_or_default()
        ));
        out.push_str(&format!(
            "End Time   : {}",
            self.timer.end_time().map(Timer::timestamp).unwrap_or_default()
        ));

        if let Some(path) = &self.args.out_path {
            out.push_str(&format!("\nReport     : '{}'", path.display()));
        }
        out
    }

    /// Build the JSON report document
    pub fn to_json(&self) -> Value {
        json_report(&self.table, &self.args, &self.timer)
    }

    /// Serialize the JSON report with 4-space indentation
    pub fn render_json(&self) -> crate::Result<String> {
        render_json(&self.to_json())
    }

    /// Full text report written to an output file
    pub fn render_text_report(&self) -> String {
        format!(
            "{} ({}) scan report\n\n{}\n\n{}",
            APP_NAME,
            REPO,
            self.summary(),
            self.render_table(false)
        )
    }
}

/// Build the complete JSON report document
pub fn json_report(table: &SvcTable, args: &Args, timer: &Timer) -> Value {
    let services: Vec<Value> = table.services().iter().map(service_json).collect();

    json!({
        "appInfo": {
            "name": APP_NAME,
            "repository": REPO,
        },
        "scanSummary": {
            "duration": timer.elapsed().as_millis() as u64,
            "startTime": timer.beg_time().map(|t| t.timestamp_millis()).unwrap_or(0),
            "endTime": timer.end_time().map(|t| t.timestamp_millis()).unwrap_or(0),
            "reportPath": args.out_path.as_ref().map(|p| p.display().to_string()),
            "executable": args.executable,
            "arguments": args.argv,
        },
        "scanResults": {
            "target": table.addr(),
            "services": services,
        },
    })
}

/// Serialize a JSON report with 4-space indentation
pub fn render_json(value: &Value) -> crate::Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);

    serde::Serialize::serialize(value, &mut serializer)?;
    String::from_utf8(buf)
        .map_err(|e| crate::Error::Serialization(format!("non-UTF-8 JSON output: {}", e)))
}

fn service_json(info: &ServiceInfo) -> Value {
    let mut obj = Map::new();
    obj.insert("port".to_string(), json!(info.port));
    obj.insert("protocol".to_string(), json!("tcp"));
    obj.insert("state".to_string(), json!(info.state.to_string()));
    obj.insert("service".to_string(), json!(info.service));
    obj.insert("summary".to_string(), json!(info.summary));
    obj.insert("banner".to_string(), json!(info.banner));

    // TLS keys ride on a captured cipher suite
    if !info.cipher.is_empty() {
        obj.insert("cipherSuite".to_string(), json!(info.cipher));
        obj.insert("x509Issuer".to_string(), json!(info.issuer));
        obj.insert("x509Subject".to_string(), json!(info.subject));
    }

    let http_headers_seen = info
        .response
        .as_ref()
        .is_some_and(|resp| !resp.headers.is_empty());

    if http_headers_seen {
        if let (Some(request), Some(response)) = (&info.request, &info.response) {
            obj.insert(
                "httpInfo".to_string(),
                json!({
                    "request": {
                        "version": request.version.dotted(),
                        "method": request.method.to_string(),
                        "uri": request.uri,
                        "headers": headers_json(&request.headers),
                    },
                    "response": {
                        "version": response.version.dotted(),
                        "status": response.status,
                        "reason": response.reason,
                        "headers": headers_json(&response.headers),
                        "body": response.body,
                    },
                }),
            );
        }
    }

    Value::Object(obj)
}

fn headers_json(headers: &crate::http::HeaderMap) -> Value {
    let mut obj = Map::new();
    for (name, value) in headers.iter() {
        obj.insert(name.clone(), json!(value));
    }
    Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Request, Response};
    use crate::types::Endpoint;

    fn sample_services() -> Vec<ServiceInfo> {
        let mut https = ServiceInfo::new(&Endpoint::new("127.0.0.1", 443));
        https.state = HostState::Open;
        https.service = "https".to_string();
        https.summary = "HTTP over TLS/SSL".to_string();

        let mut ssh = ServiceInfo::new(&Endpoint::new("127.0.0.1", 22));
        ssh.parse_banner("SSH-2.0-OpenSSH_9.0\r\n");

        vec![https, ssh]
    }

    #[test]
    fn test_table_sorted_by_port() {
        let table = SvcTable::new("127.0.0.1", sample_services());
        let ports: Vec<u16> = table.services().iter().map(|s| s.port).collect();
        assert_eq!(ports, vec![22, 443]);
    }

    #[test]
    fn test_table_render_layout() {
        let table = SvcTable::new("127.0.0.1", sample_services());
        let text = table.render(false);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Target: 127.0.0.1");
        assert_eq!(lines[1], "-".repeat(lines[0].len()));
        assert!(lines[2].starts_with("PORT"));
        assert!(lines[2].contains("SERVICE"));
        assert!(lines[3].starts_with("22/2.0"));
        assert!(lines[4].starts_with("443/tcp"));

        // Columns line up: STATE starts at the same offset in every row
        let state_col = lines[2].find("STATE").unwrap();
        assert_eq!(&lines[4][state_col..state_col + 4], "open");
    }

    #[test]
    fn test_table_render_no_color_codes() {
        let table = SvcTable::new("localhost", sample_services());
        assert!(!table.render(false).contains('\x1b'));
    }

    #[test]
    fn test_json_report_shape() {
        let table = SvcTable::new("127.0.0.1", sample_services());
        let args = Args::new("127.0.0.1", vec![22, 443]);
        let timer = Timer::new();

        let report = json_report(&table, &args, &timer);

        assert_eq!(report["appInfo"]["name"], "SvcScan");
        assert_eq!(report["appInfo"]["repository"], REPO);
        assert_eq!(report["scanSummary"]["reportPath"], Value::Null);
        assert_eq!(report["scanResults"]["target"], "127.0.0.1");

        let services = report["scanResults"]["services"].as_array().unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0]["port"], 22);
        assert_eq!(services[1]["port"], 443);
        assert_eq!(services[0]["state"], "open");
        assert_eq!(services[0]["banner"], "SSH-2.0-OpenSSH_9.0");

        // No TLS capture, no HTTP probe: optional keys absent
        assert!(services[0].get("cipherSuite").is_none());
        assert!(services[0].get("httpInfo").is_none());
    }

    #[test]
    fn test_json_report_tls_keys() {
        let mut info = ServiceInfo::new(&Endpoint::new("127.0.0.1", 443));
        info.cipher = "TLS13_AES_256_GCM_SHA384".to_string();
        info.issuer = "CN=Example CA".to_string();
        info.subject = "CN=example.com".to_string();

        let table = SvcTable::new("127.0.0.1", vec![info]);
        let args = Args::new("127.0.0.1", vec![443]);
        let report = json_report(&table, &args, &Timer::new());

        let svc = &report["scanResults"]["services"][0];
        assert_eq!(svc["cipherSuite"], "TLS13_AES_256_GCM_SHA384");
        assert_eq!(svc["x509Issuer"], "CN=Example CA");
        assert_eq!(svc["x509Subject"], "CN=example.com");
    }

    #[test]
    fn test_json_report_http_info() {
        let mut info = ServiceInfo::new(&Endpoint::new("127.0.0.1", 80));
        let request = Request::new("127.0.0.1", "/");
        let response =
            Response::parse(b"HTTP/1.1 200 OK\r\nServer: nginx/1.25.3\r\n\r\n").unwrap();
        info.set_http(request, response, false);

        let table = SvcTable::new("127.0.0.1", vec![info]);
        let args = Args::new("127.0.0.1", vec![80]);
        let report = json_report(&table, &args, &Timer::new());

        let http = &report["scanResults"]["services"][0]["httpInfo"];
        assert_eq!(http["request"]["method"], "HEAD");
        assert_eq!(http["request"]["uri"], "/");
        assert_eq!(http["request"]["version"], "1.1");
        assert_eq!(http["response"]["status"], 200);
        assert_eq!(http["response"]["reason"], "OK");
        assert_eq!(http["response"]["headers"]["Server"], "nginx/1.25.3");
    }

    #[test]
    fn test_scan_report_summary() {
        let mut args = Args::new("127.0.0.1", vec![80]);
        args.out_path = Some("scan.txt".into());

        let mut timer = Timer::new();
        timer.start();
        timer.stop();

        let report = ScanReport::new(SvcTable::new("127.0.0.1", Vec::new()), args, timer);
        let summary = report.summary();

        assert!(summary.starts_with("Scan Summary\n"));
        assert!(summary.contains("Duration   : "));
        assert!(summary.contains("Start Time : "));
        assert!(summary.contains("End Time   : "));
        assert!(summary.ends_with("Report     : 'scan.txt'"));
    }

    #[test]
    fn test_text_report_header() {
        let report = ScanReport::new(
            SvcTable::new("127.0.0.1", Vec::new()),
            Args::new("127.0.0.1", vec![80]),
            Timer::new(),
        );
        let text = report.render_text_report();
        assert!(text.starts_with(&format!("SvcScan ({}) scan report", REPO)));
        assert!(text.contains("Target: 127.0.0.1"));
    }

    #[test]
    fn test_render_json_indentation() {
        let table = SvcTable::new("127.0.0.1", Vec::new());
        let args = Args::new("127.0.0.1", vec![80]);
        let report = json_report(&table, &args, &Timer::new());

        let text = render_json(&report).unwrap();
        assert!(text.starts_with("{\n    \"appInfo\""));
    }
}
