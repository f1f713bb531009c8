//! Static file serving handler
//!
//! Fallback for every GET that no application route claims: files under the
//! root are streamed, directories get their index file or a listing.

use crate::request::percent_decode;
use crate::{Request, Response, ResponseBuilder, StatusCode};
use std::path::{Component, Path, PathBuf};

const CHUNK_SIZE: usize = 64 * 1024;

/// Static file configuration
#[derive(Debug, Clone)]
pub struct StaticFileConfig {
    /// Root directory
    pub root: PathBuf,
    /// Index file name
    pub index: String,
    /// Enable directory listing
    pub listing: bool,
    /// Enable ETag
    pub etag: bool,
}

impl Default for StaticFileConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            index: "index.html".to_string(),
            listing: true,
            etag: true,
        }
    }
}

impl StaticFileConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }
}

/// Static file handler
pub struct StaticFiles {
    config: StaticFileConfig,
}

impl StaticFiles {
    pub fn new(config: StaticFileConfig) -> Self {
        Self { config }
    }

    /// Serve static files from directory
    pub fn serve(root: impl Into<PathBuf>) -> Self {
        Self::new(StaticFileConfig::new(root))
    }

    /// Handle request for static file
    pub async fn handle(&self, req: &Request) -> Response {
        let Some(relative) = self.sanitize_path(&req.path) else {
            return Response::not_found("File not found");
        };
        let full_path = self.config.root.join(&relative);

        let meta = match tokio::fs::metadata(&full_path).await {
            Ok(meta) => meta,
            Err(_) => return Response::not_found("File not found"),
        };

        if !meta.is_dir() {
            return self.serve_file(&full_path, &meta, req).await;
        }

        if !req.path.ends_with('/') {
            let location = match &req.query {
                Some(q) => format!("{}/?{}", req.path, q),
                None => format!("{}/", req.path),
            };
            return Response::redirect(&location);
        }

        let index_path = full_path.join(&self.config.index);
        if let Ok(index_meta) = tokio::fs::metadata(&index_path).await {
            if index_meta.is_file() {
                return self.serve_file(&index_path, &index_meta, req).await;
            }
        }

        if self.config.listing {
            return self.list_directory(&full_path, &req.path).await;
        }

        Response::not_found("File not found")
    }

    /// Decode the request path and reject traversal or dot-file components.
    fn sanitize_path(&self, path: &str) -> Option<PathBuf> {
        let decoded = percent_decode(path, false);
        let path = decoded.trim_start_matches('/');

        if path.split('/').any(|s| s.starts_with('.')) {
            return None;
        }

        let mut result = PathBuf::new();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(c) => result.push(c),
                Component::ParentDir => return None,
                _ => {}
            }
        }

        Some(result)
    }

    async fn serve_file(&self, path: &Path, meta: &std::fs::Metadata, req: &Request) -> Response {
        let etag = self.config.etag.then(|| generate_etag(meta));
        if let (Some(etag), Some(if_none_match)) = (&etag, req.header("if-none-match")) {
            if if_none_match == etag {
                return ResponseBuilder::new(StatusCode::NOT_MODIFIED).build();
            }
        }

        let file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "cannot open static file");
                return Response::not_found("File not found");
            }
        };

        let mut builder = ResponseBuilder::new(StatusCode::OK)
            .header("Content-Type", mime_type(path))
            .header("Content-Length", meta.len().to_string());

        if let Some(etag) = etag {
            builder = builder.header("ETag", etag);
        }

        builder.file(file, CHUNK_SIZE).build()
    }

    async fn list_directory(&self, path: &Path, request_path: &str) -> Response {
        let mut entries = Vec::new();

        let mut dir = match tokio::fs::read_dir(path).await {
            Ok(d) => d,
            Err(_) => return Response::not_found("No permission to list directory"),
        };

        while let Ok(Some(entry)) = dir.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }

            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            entries.push((name, is_dir));
        }

        entries.sort_by(|a, b| match (a.1, b.1) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => a.0.to_lowercase().cmp(&b.0.to_lowercase()),
        });

        Response::html(render_listing(&percent_decode(request_path, false), &entries))
    }
}

fn render_listing(path: &str, entries: &[(String, bool)]) -> String {
    let title = escape_html(path);
    let mut html = String::from("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    html.push_str(&format!("<title>Directory listing for {}</title>", title));
    html.push_str("</head><body>");
    html.push_str(&format!("<h1>Directory listing for {}</h1>", title));
    html.push_str("<hr><ul>");

    for (name, is_dir) in entries {
        let display = if *is_dir {
            format!("{}/", name)
        } else {
            name.clone()
        };
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>",
            encode_href(&display),
            escape_html(&display)
        ));
    }

    html.push_str("</ul><hr></body></html>");
    html
}

/// Percent-encode a relative link, keeping unreserved bytes and `/`.
fn encode_href(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~' | b'/') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn generate_etag(meta: &std::fs::Metadata) -> String {
    use std::time::UNIX_EPOCH;

    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);

    format!("\"{:x}-{:x}\"", mtime, meta.len())
}

fn mime_type(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match ext.to_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",

        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",

        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "woff2" => "font/woff2",
        "zip" => "application/zip",
        "pdf" => "application/pdf",

        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Method, RequestBuilder};

    #[test]
    fn test_sanitize_path() {
        let handler = StaticFiles::serve(".");

        assert!(handler.sanitize_path("/index.html").is_some());
        assert!(handler.sanitize_path("/css/style.css").is_some());
        assert!(handler.sanitize_path("/../etc/passwd").is_none());
        assert!(handler.sanitize_path("/%2E%2E/secret").is_none());
        assert!(handler.sanitize_path("/.hidden").is_none());
        assert_eq!(
            handler.sanitize_path("/my%20photos/a.png"),
            Some(PathBuf::from("my photos/a.png"))
        );
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(mime_type(Path::new("index.html")), "text/html; charset=utf-8");
        assert_eq!(mime_type(Path::new("image.png")), "image/png");
        assert_eq!(mime_type(Path::new("unknown")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_serves_file_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("hello.txt"), b"hi there").unwrap();
        std::fs::write(dir.path().join("sub").join("b.txt"), b"b").unwrap();
        let handler = StaticFiles::serve(dir.path());

        let res = handler.handle(&RequestBuilder::new(Method::Get, "/hello.txt").build()).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.header("content-length"), Some("8"));
        assert_eq!(&res.body.collect().await.unwrap()[..], b"hi there");

        let res = handler.handle(&RequestBuilder::new(Method::Get, "/").build()).await;
        let html = res.body_string().unwrap();
        assert!(html.contains("sub/"));
        assert!(html.contains("hello.txt"));

        let res = handler.handle(&RequestBuilder::new(Method::Get, "/sub").build()).await;
        assert_eq!(res.status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(res.header("location"), Some("/sub/"));

        let res = handler.handle(&RequestBuilder::new(Method::Get, "/nope.txt").build()).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_etag_not_modified() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.css"), b"body{}").unwrap();
        let handler = StaticFiles::serve(dir.path());

        let res = handler.handle(&RequestBuilder::new(Method::Get, "/a.css").build()).await;
        let etag = res.header("etag").unwrap().to_string();

        let req = RequestBuilder::new(Method::Get, "/a.css")
            .header("If-None-Match", etag)
            .build();
        let res = handler.handle(&req).await;
        assert_eq!(res.status, StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_index_file_preferred_over_listing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), b"<p>home</p>").unwrap();
        let handler = StaticFiles::serve(dir.path());

        let res = handler.handle(&RequestBuilder::new(Method::Get, "/").build()).await;
        assert_eq!(res.content_type(), Some("text/html; charset=utf-8"));
        assert_eq!(&res.body.collect().await.unwrap()[..], b"<p>home</p>");
    }

    #[test]
    fn test_listing_links_are_percent_encoded() {
        let entries = vec![
            ("a b#1?.png".to_string(), false),
            ("100%".to_string(), true),
            ("<x>&y".to_string(), false),
        ];
        let html = render_listing("/", &entries);

        assert!(html.contains(r#"<a href="a%20b%231%3F.png">a b#1?.png</a>"#));
        assert!(html.contains(r#"<a href="100%25/">100%/</a>"#));
        assert!(html.contains(r#"<a href="%3Cx%3E%26y">&lt;x&gt;&amp;y</a>"#));
    }

    #[tokio::test]
    async fn test_listed_link_resolves_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("my pic#2.png"), b"png").unwrap();
        let handler = StaticFiles::serve(dir.path());

        let res = handler.handle(&RequestBuilder::new(Method::Get, "/").build()).await;
        let html = res.body_string().unwrap();
        assert!(html.contains(r#"href="my%20pic%232.png""#));

        let res = handler
            .handle(&RequestBuilder::new(Method::Get, "/my%20pic%232.png").build())
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(&res.body.collect().await.unwrap()[..], b"png");
    }

    #[tokio::test]
    async fn test_listing_and_etag_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.css"), b"body{}").unwrap();
        let handler = StaticFiles::new(StaticFileConfig {
            listing: false,
            etag: false,
            ..StaticFileConfig::new(dir.path())
        });

        let res = handler.handle(&RequestBuilder::new(Method::Get, "/a.css").build()).await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.header("etag").is_none());

        let res = handler.handle(&RequestBuilder::new(Method::Get, "/").build()).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }
}
