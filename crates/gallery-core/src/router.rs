//! Request routing
//!
//! [`Route`] maps method and path to an application route; [`App`] owns the
//! shared state and runs each request through the middleware chain before
//! dispatching it.

use crate::abuse::{AbuseDetector, BanRegistry, SuspiciousPatternSet};
use crate::config::AppConfig;
use crate::handlers::{Gallery, StaticFiles};
use crate::middleware::{AccessLog, AdmissionGuard, MiddlewareChain};
use crate::{Body, Method, Request, Response, Result, StatusCode};
use std::sync::Arc;

/// Application routes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Favicon,
    RandomImage,
    GetComments,
    SecondaryPage,
    Download,
    AddComment,
    /// Anything else under GET: the static file handler
    Static,
    NotFound,
    NotImplemented,
}

impl Route {
    /// Resolve a route from the method and the path without its query.
    ///
    /// HEAD resolves like GET.
    pub fn resolve(method: Method, path: &str) -> Route {
        match method {
            Method::Get | Method::Head => match path {
                "/" => Route::Home,
                "/favicon.ico" => Route::Favicon,
                "/random_image" => Route::RandomImage,
                "/minecraft" => Route::SecondaryPage,
                "/download_modpack" => Route::Download,
                p if p.starts_with("/get_comments") => Route::GetComments,
                _ => Route::Static,
            },
            Method::Post => match path {
                "/add_comment" => Route::AddComment,
                _ => Route::NotFound,
            },
            _ => Route::NotImplemented,
        }
    }
}

/// The whole application: shared state plus the request pipeline
pub struct App {
    gallery: Gallery,
    static_files: StaticFiles,
    bans: Arc<BanRegistry>,
    middleware: MiddlewareChain,
    max_body_bytes: usize,
}

impl App {
    /// Load every piece of persisted and on-disk state named by `config`.
    pub fn load(config: AppConfig) -> Result<Self> {
        let gallery = Gallery::load(&config)?;
        let bans = Arc::new(BanRegistry::load(&config.bans_file)?);
        let detector = Arc::new(AbuseDetector::new(
            SuspiciousPatternSet::standard()?,
            config.guard.window,
            config.guard.strikes,
        ));

        tracing::info!(
            images = gallery.catalog().len(),
            commented_images = gallery.comments().image_count(),
            bans = bans.len(),
            "application state loaded"
        );

        Ok(Self::from_parts(config, gallery, bans, detector))
    }

    /// Assemble from already loaded parts.
    pub fn from_parts(
        config: AppConfig,
        gallery: Gallery,
        bans: Arc<BanRegistry>,
        detector: Arc<AbuseDetector>,
    ) -> Self {
        let guard = AdmissionGuard::new(bans.clone(), detector, config.guard.clone());
        let middleware = MiddlewareChain::new().with(AccessLog::new()).with(guard);

        Self {
            gallery,
            static_files: StaticFiles::serve(&config.static_root),
            bans,
            middleware,
            max_body_bytes: config.max_body_bytes,
        }
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn bans(&self) -> &BanRegistry {
        &self.bans
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Run one request through admission, routing and logging.
    pub async fn handle(&self, mut req: Request) -> Response {
        let mut res = match self.middleware.run_before(&mut req) {
            Some(res) => res,
            None => self.dispatch(&req).await,
        };

        self.middleware.run_after(&req, &mut res);

        if req.method == Method::Head {
            res.body = Body::default();
        }
        res
    }

    async fn dispatch(&self, req: &Request) -> Response {
        match Route::resolve(req.method, &req.path) {
            Route::Home => self.gallery.home(),
            Route::Favicon => self.gallery.favicon().await,
            Route::RandomImage => self.gallery.random_image().await,
            Route::GetComments => self.gallery.get_comments(req),
            Route::SecondaryPage => self.gallery.secondary_page().await,
            Route::Download => self.gallery.download().await,
            Route::AddComment => self.gallery.add_comment(req),
            Route::Static => self.static_files.handle(req).await,
            Route::NotFound => Response::not_found("Not Found"),
            Route::NotImplemented => {
                Response::text(StatusCode::NOT_IMPLEMENTED, "Unsupported method")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_routes() {
        assert_eq!(Route::resolve(Method::Get, "/"), Route::Home);
        assert_eq!(Route::resolve(Method::Get, "/favicon.ico"), Route::Favicon);
        assert_eq!(Route::resolve(Method::Get, "/random_image"), Route::RandomImage);
        assert_eq!(Route::resolve(Method::Get, "/minecraft"), Route::SecondaryPage);
        assert_eq!(Route::resolve(Method::Get, "/download_modpack"), Route::Download);
        assert_eq!(Route::resolve(Method::Get, "/get_comments"), Route::GetComments);
        assert_eq!(Route::resolve(Method::Get, "/get_comments/extra"), Route::GetComments);
        assert_eq!(Route::resolve(Method::Get, "/photos/cat.png"), Route::Static);
        assert_eq!(Route::resolve(Method::Get, "/random_image/"), Route::Static);
    }

    #[test]
    fn test_head_routes_like_get() {
        assert_eq!(Route::resolve(Method::Head, "/"), Route::Home);
        assert_eq!(Route::resolve(Method::Head, "/x.css"), Route::Static);
    }

    #[test]
    fn test_post_and_other_methods() {
        assert_eq!(Route::resolve(Method::Post, "/add_comment"), Route::AddComment);
        assert_eq!(Route::resolve(Method::Post, "/"), Route::NotFound);
        assert_eq!(Route::resolve(Method::Put, "/add_comment"), Route::NotImplemented);
        assert_eq!(Route::resolve(Method::Delete, "/"), Route::NotImplemented);
    }
}
