//! gallery-core: image gallery HTTP server core
//!
//! Serves a home page, random images from local folders, per-image comments
//! and a file download. Every request first passes an admission guard that
//! bans addresses sending exploit probes.
//!
//! ## Layout
//! - [`abuse`] - denylist, offense history, ban registry
//! - [`store`] - JSON-file persistence and the comment store
//! - [`catalog`] - image discovery
//! - [`handlers`] - application routes and the static file fallback
//! - [`router`] - route table and the [`App`] pipeline
//! - [`server`] - listener and hyper connection loop

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod abuse;
pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod store;

// Re-exports
pub use error::{Error, Result};
pub use request::{Method, Request, RequestBuilder};
pub use response::{Body, Response, ResponseBuilder, StatusCode};
pub use router::{App, Route};

pub use abuse::{AbuseDetector, BanNotice, BanRegistry, Classification, SuspiciousPatternSet};
pub use catalog::ImageCatalog;
pub use config::{AppConfig, DownloadConfig, GuardConfig, ServerConfig};
pub use store::CommentStore;

// Middleware re-exports
pub use middleware::{AccessLog, AdmissionGuard, Middleware, MiddlewareChain};

// Handlers re-exports
pub use handlers::{Gallery, StaticFileConfig, StaticFiles};

pub use server::{bind_listener, from_hyper_request, to_hyper_response, Server};
