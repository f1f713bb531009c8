//! HTTP Response types

use bytes::{Bytes, BytesMut};
use smallvec::SmallVec;
use tokio::io::AsyncReadExt;

/// HTTP Status Code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(pub u16);

impl StatusCode {
    // 2xx Success
    pub const OK: StatusCode = StatusCode(200);

    // 3xx Redirection
    pub const MOVED_PERMANENTLY: StatusCode = StatusCode(301);
    pub const NOT_MODIFIED: StatusCode = StatusCode(304);

    // 4xx Client Errors
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const PAYLOAD_TOO_LARGE: StatusCode = StatusCode(413);

    // 5xx Server Errors
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);
    pub const NOT_IMPLEMENTED: StatusCode = StatusCode(501);

    /// Get the numeric code
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Get the reason phrase
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            301 => "Moved Permanently",
            304 => "Not Modified",
            400 => "Bad Request",
            403 => "Forbidden",
            404 => "Not Found",
            413 => "Payload Too Large",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            _ => "Unknown",
        }
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.0, self.reason_phrase())
    }
}

/// Response payload
#[derive(Debug)]
pub enum Body {
    /// Fully buffered body
    Bytes(Bytes),
    /// Open file streamed to the client in `chunk_size` reads
    File {
        file: tokio::fs::File,
        chunk_size: usize,
    },
}

impl Body {
    /// Drain the body into memory.
    pub async fn collect(self) -> std::io::Result<Bytes> {
        match self {
            Body::Bytes(bytes) => Ok(bytes),
            Body::File { mut file, .. } => {
                let mut buf = Vec::new();
                file.read_to_end(&mut buf).await?;
                Ok(Bytes::from(buf))
            }
        }
    }

    /// Read the next chunk of a file body; `None` at end of file.
    pub(crate) async fn read_chunk(
        file: &mut tokio::fs::File,
        chunk_size: usize,
    ) -> std::io::Result<Option<Bytes>> {
        let mut buf = BytesMut::with_capacity(chunk_size);
        let n = file.read_buf(&mut buf).await?;
        if n == 0 {
            Ok(None)
        } else {
            Ok(Some(buf.freeze()))
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::Bytes(Bytes::new())
    }
}

/// HTTP Response
#[derive(Debug)]
pub struct Response {
    /// Status code
    pub status: StatusCode,
    /// Response headers (stack-allocated for small header counts)
    pub headers: SmallVec<[(String, String); 8]>,
    /// Response body
    pub body: Body,
}

impl Response {
    /// Create a new response
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: SmallVec::new(),
            body: Body::default(),
        }
    }

    /// Create a 200 OK response
    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// Create a JSON response
    pub fn json(body: impl Into<Bytes>) -> Self {
        ResponseBuilder::new(StatusCode::OK)
            .header("Content-Type", "application/json")
            .body(body)
            .build()
    }

    /// Create a plain-text response with the given status
    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        ResponseBuilder::new(status)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .build()
    }

    /// Create an HTML response
    pub fn html(body: impl Into<Bytes>) -> Self {
        ResponseBuilder::new(StatusCode::OK)
            .header("Content-Type", "text/html; charset=utf-8")
            .body(body)
            .build()
    }

    /// Create a permanent redirect
    pub fn redirect(location: &str) -> Self {
        ResponseBuilder::new(StatusCode::MOVED_PERMANENTLY)
            .header("Location", location)
            .build()
    }

    /// Create a 404 Not Found response
    pub fn not_found(message: &str) -> Self {
        Self::text(StatusCode::NOT_FOUND, message.to_string())
    }

    /// Create a 400 Bad Request response
    pub fn bad_request(message: &str) -> Self {
        Self::text(StatusCode::BAD_REQUEST, message.to_string())
    }

    /// Create a 403 Forbidden response
    pub fn forbidden(message: &str) -> Self {
        Self::text(StatusCode::FORBIDDEN, message.to_string())
    }

    /// Create a 500 Internal Server Error response
    pub fn internal_error(message: &str) -> Self {
        Self::text(StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
    }

    /// Get a header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get content-type header
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Buffered body bytes; `None` for streamed bodies
    pub fn body_bytes(&self) -> Option<&Bytes> {
        match &self.body {
            Body::Bytes(bytes) => Some(bytes),
            Body::File { .. } => None,
        }
    }

    /// Get a buffered body as string (if UTF-8)
    pub fn body_string(&self) -> Option<String> {
        self.body_bytes()
            .and_then(|b| std::str::from_utf8(b).ok())
            .map(|s| s.to_string())
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}

/// Builder for constructing responses
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    /// Create a new builder
    pub fn new(status: StatusCode) -> Self {
        Self {
            response: Response::new(status),
        }
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response.headers.push((name.into(), value.into()));
        self
    }

    /// Set a buffered body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.response.body = Body::Bytes(body.into());
        self
    }

    /// Stream an open file as the body
    pub fn file(mut self, file: tokio::fs::File, chunk_size: usize) -> Self {
        self.response.body = Body::File { file, chunk_size };
        self
    }

    /// Build the response
    pub fn build(self) -> Response {
        self.response
    }
}
