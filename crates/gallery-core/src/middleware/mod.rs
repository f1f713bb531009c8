//! Middleware
//!
//! Request admission and access logging run around every handler.

pub mod access_log;
pub mod guard;

pub use access_log::AccessLog;
pub use guard::AdmissionGuard;

use crate::{Request, Response};

/// Middleware trait - process request/response
pub trait Middleware: Send + Sync {
    /// Process request before handler; returning a response ends the request
    fn before(&self, req: &mut Request) -> Option<Response>;

    /// Process response after handler
    fn after(&self, req: &Request, res: &mut Response);
}

/// Middleware chain
pub struct MiddlewareChain {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
    }

    /// Builder form of [`MiddlewareChain::add`].
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.add(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Run before middlewares, return early response if any
    pub fn run_before(&self, req: &mut Request) -> Option<Response> {
        for m in &self.middlewares {
            if let Some(res) = m.before(req) {
                return Some(res);
            }
        }
        None
    }

    /// Run after middlewares in reverse order
    pub fn run_after(&self, req: &Request, res: &mut Response) {
        for m in self.middlewares.iter().rev() {
            m.after(req, res);
        }
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Method, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Stop;

    impl Middleware for Stop {
        fn before(&self, _req: &mut Request) -> Option<Response> {
            Some(Response::forbidden("stop"))
        }

        fn after(&self, _req: &Request, _res: &mut Response) {}
    }

    struct Count(Arc<AtomicUsize>);

    impl Middleware for Count {
        fn before(&self, _req: &mut Request) -> Option<Response> {
            self.0.fetch_add(1, Ordering::SeqCst);
            None
        }

        fn after(&self, _req: &Request, res: &mut Response) {
            res.headers.push(("X-Seen".to_string(), "1".to_string()));
        }
    }

    #[test]
    fn test_short_circuit() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = MiddlewareChain::new().with(Stop).with(Count(hits.clone()));
        assert_eq!(chain.len(), 2);

        let mut req = Request::new(Method::Get, "/");
        let res = chain.run_before(&mut req).unwrap();
        assert_eq!(res.status, StatusCode::FORBIDDEN);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_after_runs_for_all() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = MiddlewareChain::new().with(Count(hits.clone()));

        let mut req = Request::new(Method::Get, "/");
        assert!(chain.run_before(&mut req).is_none());
        let mut res = Response::ok();
        chain.run_after(&req, &mut res);
        assert_eq!(res.header("x-seen"), Some("1"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
