//! HTTP Request types

use crate::{Error, Result};
use smallvec::SmallVec;
use std::net::IpAddr;
use std::time::Instant;

/// HTTP Methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Connect,
    Trace,
}

impl Method {
    /// Parse from string
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "CONNECT" => Ok(Method::Connect),
            "TRACE" => Ok(Method::Trace),
            _ => Err(Error::InvalidMethod(s.to_string())),
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Connect => "CONNECT",
            Method::Trace => "TRACE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HTTP Request
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Request path, still percent-encoded, without query string
    pub path: String,
    /// Query string (without leading ?)
    pub query: Option<String>,
    /// Request headers
    pub headers: SmallVec<[(String, String); 16]>,
    /// Request body
    pub body: bytes::Bytes,
    /// Peer address of the connection
    pub remote_addr: Option<IpAddr>,
    /// When the request was taken off the connection
    pub received_at: Instant,
}

impl Request {
    /// Create a new request
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: SmallVec::new(),
            body: bytes::Bytes::new(),
            remote_addr: None,
            received_at: Instant::now(),
        }
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Path plus query string exactly as sent on the request line.
    pub fn target(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// Key used to track the client in the ban list and offense history.
    pub fn client_key(&self) -> String {
        self.remote_addr
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// First value of a query-string parameter.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query.as_deref().and_then(|q| form_value(q, name))
    }

    /// First value of a field in an `application/x-www-form-urlencoded` body.
    pub fn form_param(&self, name: &str) -> Option<String> {
        let body = String::from_utf8_lossy(&self.body);
        form_value(&body, name)
    }
}

/// Builder for constructing requests
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    /// Create a new builder
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request: Request::new(method, path),
        }
    }

    /// Set query string
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.request.query = Some(query.into());
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.push((name.into(), value.into()));
        self
    }

    /// Set body
    pub fn body(mut self, body: impl Into<bytes::Bytes>) -> Self {
        self.request.body = body.into();
        self
    }

    /// Set the peer address
    pub fn remote_addr(mut self, addr: IpAddr) -> Self {
        self.request.remote_addr = Some(addr);
        self
    }

    /// Build the request
    pub fn build(self) -> Request {
        self.request
    }
}

/// Look up the first occurrence of `name` in an urlencoded `k=v&k=v` string.
///
/// Pairs without `=` are skipped, an empty value is returned as `Some("")`.
fn form_value(encoded: &str, name: &str) -> Option<String> {
    encoded
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| percent_decode(key, true) == name)
        .map(|(_, value)| percent_decode(value, true))
}

/// Percent-decode a URL component.
///
/// Decoded bytes are reassembled as UTF-8; invalid sequences are replaced.
/// With `plus_as_space`, `+` decodes to a space as in form bodies.
pub fn percent_decode(s: &str, plus_as_space: bool) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' if plus_as_space => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
