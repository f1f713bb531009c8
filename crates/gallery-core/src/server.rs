//! Native HTTP server
//!
//! HTTP/1.1 over tokio and hyper:
//! - Listener built with socket2 (SO_REUSEADDR)
//! - TCP_NODELAY on accepted streams
//! - One task per connection, no connection limit

use crate::config::ServerConfig;
use crate::{App, Body, Error, Method, Request, Response, Result, StatusCode};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use std::convert::Infallible;
use std::io;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Body type handed to hyper
pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

/// Create a listening TCP socket
fn create_socket(addr: &SocketAddr) -> io::Result<Socket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // SO_REUSEADDR - allow binding to address in TIME_WAIT
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&(*addr).into())?;
    socket.listen(1024)?;

    Ok(socket)
}

/// Bind a tokio listener on `addr`.
///
/// A privileged port refused by the OS maps to [`Error::PermissionDenied`]
/// so the caller can offer another port. Must be called inside a runtime.
pub fn bind_listener(addr: SocketAddr) -> Result<TcpListener> {
    let socket = create_socket(&addr).map_err(|source| {
        if source.kind() == io::ErrorKind::PermissionDenied {
            Error::PermissionDenied { port: addr.port() }
        } else {
            Error::Bind { addr, source }
        }
    })?;

    let listener: std::net::TcpListener = socket.into();
    Ok(TcpListener::from_std(listener)?)
}

/// Bound HTTP server
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Resolve `hostname:port` and bind. Must be called inside a runtime.
    pub fn bind(config: &ServerConfig) -> Result<Self> {
        let addr = (config.hostname.as_str(), config.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                Error::Io(io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("{} did not resolve", config.hostname),
                ))
            })?;

        let listener = bind_listener(addr)?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections forever, serving each on its own task.
    pub async fn run(self, app: Arc<App>) -> Result<()> {
        tracing::info!(addr = %self.local_addr, "listening");

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                    continue;
                }
            };

            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(peer = %peer, error = %e, "cannot set TCP_NODELAY");
            }

            let app = app.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let app = app.clone();
                    async move { Ok::<_, Infallible>(serve_request(app, req, peer.ip()).await) }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::debug!(peer = %peer, error = %e, "connection error");
                }
            });
        }
    }
}

async fn serve_request(
    app: Arc<App>,
    req: hyper::Request<Incoming>,
    peer: IpAddr,
) -> hyper::Response<ResponseBody> {
    let res = match from_hyper_request(req, peer, app.max_body_bytes()).await {
        Ok(request) => app.handle(request).await,
        Err(res) => res,
    };
    to_hyper_response(res)
}

/// Convert a hyper request, buffering at most `max_body` bytes of body.
///
/// Requests that cannot be represented are answered directly: unknown
/// methods with 501, oversized bodies with 413.
pub async fn from_hyper_request<B>(
    req: hyper::Request<B>,
    peer: IpAddr,
    max_body: usize,
) -> std::result::Result<Request, Response>
where
    B: hyper::body::Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let Ok(method) = Method::from_str(req.method().as_str()) else {
        return Err(Response::text(StatusCode::NOT_IMPLEMENTED, "Unsupported method"));
    };

    let (parts, body) = req.into_parts();
    let mut request = Request::new(method, parts.uri.path());
    request.query = parts.uri.query().map(|s| s.to_string());
    request.remote_addr = Some(peer);

    for (name, value) in &parts.headers {
        if let Ok(v) = value.to_str() {
            request.headers.push((name.to_string(), v.to_string()));
        }
    }

    request.body = match Limited::new(body, max_body).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return Err(Response::text(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large"));
        }
        Err(e) => {
            tracing::debug!(peer = %peer, error = %e, "cannot read request body");
            return Err(Response::bad_request("Bad Request"));
        }
    };

    Ok(request)
}

/// Convert our Response to a hyper Response
///
/// Headers hyper cannot represent are dropped with a warning.
pub fn to_hyper_response(res: Response) -> hyper::Response<ResponseBody> {
    let mut out = hyper::Response::new(into_body(res.body));
    *out.status_mut() = http::StatusCode::from_u16(res.status.as_u16())
        .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);

    for (name, value) in &res.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            (Ok(name), Ok(value)) => {
                out.headers_mut().append(name, value);
            }
            _ => tracing::warn!(header = %name, "dropping invalid response header"),
        }
    }

    out
}

fn into_body(body: Body) -> ResponseBody {
    match body {
        Body::Bytes(bytes) => Full::new(bytes)
            .map_err(|never: Infallible| match never {})
            .boxed_unsync(),
        Body::File { file, chunk_size } => {
            let chunks = futures_util::stream::unfold(Some(file), move |state| async move {
                let mut file = state?;
                match Body::read_chunk(&mut file, chunk_size).await {
                    Ok(Some(chunk)) => Some((Ok(Frame::data(chunk)), Some(file))),
                    Ok(None) => None,
                    Err(e) => {
                        tracing::error!(error = %e, "file read failed mid-stream");
                        Some((Err(e), None))
                    }
                }
            });
            StreamBody::new(chunks).boxed_unsync()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const PEER: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[tokio::test]
    async fn test_from_hyper_request() {
        let req = hyper::Request::builder()
            .method("POST")
            .uri("/add_comment?x=1")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Full::new(Bytes::from_static(b"image_path=a.png&comment=hi")))
            .unwrap();

        let request = from_hyper_request(req, PEER, 1024).await.unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/add_comment");
        assert_eq!(request.query.as_deref(), Some("x=1"));
        assert_eq!(request.form_param("comment").as_deref(), Some("hi"));
        assert_eq!(request.client_key(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let req = hyper::Request::builder()
            .method("POST")
            .uri("/add_comment")
            .body(Full::new(Bytes::from(vec![b'a'; 64])))
            .unwrap();

        let res = from_hyper_request(req, PEER, 16).await.unwrap_err();
        assert_eq!(res.status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_unknown_method_is_not_implemented() {
        let req = hyper::Request::builder()
            .method("PROPFIND")
            .uri("/")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let res = from_hyper_request(req, PEER, 16).await.unwrap_err();
        assert_eq!(res.status, StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_to_hyper_response_streams_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, vec![1u8; 10_000]).unwrap();
        let file = tokio::fs::File::open(&path).await.unwrap();

        let res = crate::ResponseBuilder::new(StatusCode::OK)
            .header("X-Image-Path", "/tmp/bad\nvalue")
            .header("Content-Type", "application/octet-stream")
            .file(file, 4096)
            .build();
        let out = to_hyper_response(res);

        assert_eq!(out.status(), http::StatusCode::OK);
        assert!(out.headers().get("x-image-path").is_none());
        let body = out.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.len(), 10_000);
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let server = Server::bind(&ServerConfig::new().hostname("127.0.0.1").port(0)).unwrap();
        assert_ne!(server.local_addr().port(), 0);
    }
}
