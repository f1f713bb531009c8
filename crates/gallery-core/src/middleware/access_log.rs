//! Access logging middleware
//!
//! One `info` event per request on the `gallery::access` target.

use super::Middleware;
use crate::{Request, Response};

/// Logs method, target, peer, status and elapsed time after each request
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLog;

impl AccessLog {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for AccessLog {
    fn before(&self, _req: &mut Request) -> Option<Response> {
        None
    }

    fn after(&self, req: &Request, res: &mut Response) {
        let elapsed = req.received_at.elapsed();
        tracing::info!(
            target: "gallery::access",
            method = %req.method,
            uri = %req.target(),
            remote = %req.client_key(),
            status = res.status.as_u16(),
            elapsed_us = elapsed.as_micros() as u64,
            "request"
        );
    }
}
