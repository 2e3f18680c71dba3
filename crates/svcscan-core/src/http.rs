//! HTTP/1.1 request and response model
//!
//! Minimal RFC 7230 message handling for service probing: start-line and
//! header formatting, case-normalized header storage, body management, and
//! parsing that tolerates `CRLF` or bare `LF` line endings and decodes
//! chunked transfer encoding. No pipelining, no HTTP/2.
//!
//! # Examples
//!
//! ```
//! use svcscan_core::http::{Request, Response};
//!
//! let req = Request::new("scanme.example.com", "/");
//! assert!(req.valid());
//!
//! let raw = b"HTTP/1.1 200 OK\r\nServer: nginx/1.25.3\r\n\r\n";
//! let resp = Response::parse(raw).unwrap();
//! assert_eq!(resp.status, 200);
//! assert_eq!(resp.server(), "nginx/1.25.3");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Default MIME type applied when a body is set without one
pub const DEFAULT_MIME: &str = "text/plain; charset=utf-8";

/// User agent sent with every probe request
pub const USER_AGENT: &str = "SvcScan/1.0";

static URI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[!#$&-;=?-\[\]_a-z~]|%[0-9a-fA-F]{2})+$").unwrap());

/// Determine whether the given string is a usable HTTP request URI
pub fn valid_uri(uri: &str) -> bool {
    URI_RE.is_match(uri)
}

/// Errors raised while parsing an HTTP message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// Message framing or field syntax is broken
    #[error("Malformed HTTP message: {0}")]
    Malformed(String),

    /// Start-line version token is not `HTTP/<major>.<minor>`
    #[error("Invalid HTTP version: '{0}'")]
    BadVersion(String),
}

/// HTTP protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpVersion {
    pub major: u8,
    pub minor: u8,
}

impl HttpVersion {
    pub fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Derived numeric form: `major * 10 + minor`
    pub fn num(&self) -> u8 {
        self.major * 10 + self.minor
    }

    /// Numeric form as a string, e.g. `"11"` for HTTP/1.1
    pub fn num_str(&self) -> String {
        self.num().to_string()
    }

    /// Dotted form without the protocol prefix, e.g. `"1.1"`
    pub fn dotted(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    /// Parse a `HTTP/<major>.<minor>` token
    pub fn parse(token: &str) -> Result<Self, HttpError> {
        let version = token
            .strip_prefix("HTTP/")
            .ok_or_else(|| HttpError::BadVersion(token.to_string()))?;

        let (major, minor) = version
            .split_once('.')
            .ok_or_else(|| HttpError::BadVersion(token.to_string()))?;

        let major: u8 = major
            .parse()
            .map_err(|_| HttpError::BadVersion(token.to_string()))?;
        let minor: u8 = minor
            .parse()
            .map_err(|_| HttpError::BadVersion(token.to_string()))?;

        Ok(Self { major, minor })
    }
}

impl Default for HttpVersion {
    fn default() -> Self {
        Self { major: 1, minor: 1 }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

/// HTTP request method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Get,
    #[default]
    Head,
    Post,
    Put,
    Delete,
    Options,
    Trace,
    Connect,
    Patch,
    Unknown,
}

impl Method {
    pub fn parse(token: &str) -> Self {
        match token {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "OPTIONS" => Method::Options,
            "TRACE" => Method::Trace,
            "CONNECT" => Method::Connect,
            "PATCH" => Method::Patch,
            _ => Method::Unknown,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
            Method::Patch => "PATCH",
            Method::Unknown => "UNKNOWN",
        };
        write!(f, "{}", name)
    }
}

/// Normalize a header field name: hyphen-separated tokens, each title-cased
///
/// `content-TYPE` becomes `Content-Type`.
pub fn normalize_header(name: &str) -> String {
    name.split('-')
        .map(|token| {
            let mut chars = token.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Case-normalized header field map
///
/// Lookups are case-insensitive; storage always uses the normalized form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMap(BTreeMap<String, String>);

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any existing value for the same field
    pub fn insert<N: AsRef<str>, V: Into<String>>(&mut self, name: N, value: V) {
        self.0.insert(normalize_header(name.as_ref()), value.into());
    }

    /// Case-insensitive membership test
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&normalize_header(name))
    }

    /// Case-insensitive value lookup
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&normalize_header(name)).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(&normalize_header(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// HTTP request message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub version: HttpVersion,
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: String,
    chunked: bool,
}

impl Request {
    /// Create a request for the given host with the default probe headers
    pub fn new<S: Into<String>>(host: S, uri: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", "text/*, application/json, application/xml");
        headers.insert("Connection", "close");
        headers.insert("Host", host.into());
        headers.insert("User-Agent", USER_AGENT);

        Self {
            version: HttpVersion::default(),
            method: Method::Head,
            uri: uri.to_string(),
            headers,
            body: String::new(),
            chunked: false,
        }
    }

    /// Set the request method
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Replace the body, setting `Content-Type` to `mime` when given and
    /// to the plain-text default otherwise
    pub fn body<S: Into<String>>(&mut self, body: S, mime: Option<&str>) {
        self.body = body.into();
        if !self.body.is_empty() {
            self.headers
                .insert("Content-Type", mime.unwrap_or(DEFAULT_MIME));
        }
    }

    /// Whether the message used chunked transfer encoding
    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    /// A request is valid when it has a known method, a non-empty `Host`
    /// header, and a well-formed URI
    pub fn valid(&self) -> bool {
        self.method != Method::Unknown
            && self.headers.get("Host").is_some_and(|h| !h.is_empty())
            && valid_uri(&self.uri)
    }

    /// Serialize to wire format
    pub fn serialize(&self) -> Vec<u8> {
        let start_line = format!("{} {} {}", self.method, self.uri, self.version);
        serialize_message(&start_line, &self.headers, &self.body, self.chunked)
    }

    /// Parse a complete request message
    pub fn parse(raw: &[u8]) -> Result<Self, HttpError> {
        let (start_line, headers, body, chunked) = parse_message(raw)?;

        let mut tokens = start_line.split_whitespace();
        let method = tokens
            .next()
            .map(Method::parse)
            .ok_or_else(|| HttpError::Malformed("empty request line".to_string()))?;
        let uri = tokens
            .next()
            .ok_or_else(|| HttpError::Malformed("request line has no URI".to_string()))?
            .to_string();
        let version = match tokens.next() {
            Some(token) => HttpVersion::parse(token)?,
            None => return Err(HttpError::Malformed("request line has no version".to_string())),
        };

        Ok(Self {
            version,
            method,
            uri,
            headers,
            body,
            chunked,
        })
    }
}

/// HTTP response message
///
/// A status of zero means no response line was ever parsed; `valid()` is
/// false for such a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub version: HttpVersion,
    pub status: u16,
    pub reason: String,
    pub headers: HeaderMap,
    pub body: String,
    chunked: bool,
}

impl Response {
    pub fn new(status: u16, reason: &str) -> Self {
        Self {
            version: HttpVersion::default(),
            status,
            reason: reason.to_string(),
            headers: HeaderMap::new(),
            body: String::new(),
            chunked: false,
        }
    }

    /// Replace the body, setting `Content-Type` to `mime` when given and
    /// to the plain-text default otherwise
    pub fn body<S: Into<String>>(&mut self, body: S, mime: Option<&str>) {
        self.body = body.into();
        if !self.body.is_empty() {
            self.headers
                .insert("Content-Type", mime.unwrap_or(DEFAULT_MIME));
        }
    }

    /// Whether the message used chunked transfer encoding
    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    /// A response is valid once a status code has been parsed
    pub fn valid(&self) -> bool {
        self.status != 0
    }

    /// The `Server` header value, or empty when absent
    pub fn server(&self) -> &str {
        self.headers.get("Server").unwrap_or_default()
    }

    /// Serialize to wire format
    pub fn serialize(&self) -> Vec<u8> {
        let start_line = format!("{} {} {}", self.version, self.status, self.reason);
        serialize_message(&start_line, &self.headers, &self.body, self.chunked)
    }

    /// Parse a complete response message
    pub fn parse(raw: &[u8]) -> Result<Self, HttpError> {
        let (start_line, headers, body, chunked) = parse_message(raw)?;

        let mut tokens = start_line.splitn(3, ' ');
        let version = match tokens.next() {
            Some(token) if !token.is_empty() => HttpVersion::parse(token)?,
            _ => return Err(HttpError::Malformed("empty status line".to_string())),
        };
        let status: u16 = tokens
            .next()
            .and_then(|code| code.parse().ok())
            .ok_or_else(|| HttpError::Malformed("status line has no status code".to_string()))?;
        let reason = tokens.next().unwrap_or_default().to_string();

        Ok(Self {
            version,
            status,
            reason,
            headers,
            body,
            chunked,
        })
    }
}

/// Emit start-line + CRLF + headers + CRLF + CRLF + body
///
/// A non-empty body is always reflected by a `Content-Length` header; a
/// chunked body is re-encoded as a single chunk instead.
fn serialize_message(start_line: &str, headers: &HeaderMap, body: &str, chunked: bool) -> Vec<u8> {
    let mut headers = headers.clone();

    if chunked {
        headers.insert("Transfer-Encoding", "chunked");
        headers.remove("Content-Length");
    } else if !body.is_empty() {
        headers.insert("Content-Length", body.len().to_string());
    }

    let mut out = String::new();
    out.push_str(start_line);
    out.push_str("\r\n");

    for (name, value) in headers.iter() {
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
        out.push_str("\r\n");
    }
    out.push_str("\r\n");

    if chunked {
        if !body.is_empty() {
            out.push_str(&format!("{:x}\r\n{}\r\n", body.len(), body));
        }
        out.push_str("0\r\n\r\n");
    } else {
        out.push_str(body);
    }

    out.into_bytes()
}

type ParsedMessage = (String, HeaderMap, String, bool);

/// Split a raw message into start line, header map, decoded body, and a
/// chunked-encoding flag; accepts CRLF or bare LF line endings
fn parse_message(raw: &[u8]) -> Result<ParsedMessage, HttpError> {
    let text = String::from_utf8_lossy(raw);

    let (head, raw_body) = split_head_body(&text);

    let mut lines = head.lines();
    let start_line = lines
        .next()
        .map(|line| line.trim_end_matches('\r').to_string())
        .filter(|line| !line.is_empty())
        .ok_or_else(|| HttpError::Malformed("message has no start line".to_string()))?;

    let mut headers = HeaderMap::new();
    for line in lines {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| HttpError::Malformed(format!("bad header field: '{}'", line)))?;
        headers.insert(name.trim(), value.trim().to_string());
    }

    let chunked = headers
        .get("Transfer-Encoding")
        .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"));

    let body = if chunked {
        decode_chunked(raw_body)?
    } else if let Some(length) = headers.get("Content-Length") {
        let length: usize = length
            .parse()
            .map_err(|_| HttpError::Malformed("bad Content-Length value".to_string()))?;
        raw_body.chars().take(length).collect()
    } else {
        raw_body.to_string()
    };

    Ok((start_line, headers, body, chunked))
}

/// Split the header block from the body at the first blank line
fn split_head_body(text: &str) -> (&str, &str) {
    if let Some(idx) = text.find("\r\n\r\n") {
        (&text[..idx], &text[idx + 4..])
    } else if let Some(idx) = text.find("\n\n") {
        (&text[..idx], &text[idx + 2..])
    } else {
        (text, "")
    }
}

/// Decode a chunked transfer-encoded body into its payload
fn decode_chunked(raw: &str) -> Result<String, HttpError> {
    let mut body = String::new();
    let mut rest = raw;

    loop {
        let (size_line, after) = match rest.split_once('\n') {
            Some(split) => split,
            // Tolerate a body truncated at end-of-stream
            None => break,
        };

        let size_token = size_line
            .trim_end_matches('\r')
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();

        if size_token.is_empty() {
            rest = after;
            continue;
        }

        let size = usize::from_str_radix(size_token, 16)
            .map_err(|_| HttpError::Malformed(format!("bad chunk size: '{}'", size_token)))?;

        if size == 0 {
            break;
        }

        if after.len() < size {
            // Truncated chunk; keep what arrived
            body.push_str(after);
            break;
        }

        if !after.is_char_boundary(size) {
            return Err(HttpError::Malformed(format!(
                "chunk of {} bytes splits a character",
                size
            )));
        }

        body.push_str(&after[..size]);
        rest = &after[size..];
    }

    Ok(body)
}
